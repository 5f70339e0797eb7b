//! # CLI Configuration
//!
//! Optional YAML file passed with `--config`. Every field has a default, so
//! an empty file (or no file) is valid. Command-line flags override it.
//!
//! ```yaml
//! disabled_rules:
//!   - s3-versioning
//!   - lambda-dead-letter
//! fail_on: critical
//! output: json
//! ```

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use cfscan_core::Severity;
use cfscan_engine::Validator;
use cfscan_rules::RuleRegistry;
use serde::{Deserialize, Deserializer, Serialize};

/// How results are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Rule ids removed from the registry before validation.
    pub disabled_rules: Vec<String>,
    /// Lowest severity that makes `validate` exit 1.
    #[serde(deserialize_with = "severity_any_case")]
    pub fail_on: Severity,
    pub output: OutputFormat,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            disabled_rules: Vec::new(),
            fail_on: Severity::High,
            output: OutputFormat::Text,
        }
    }
}

fn severity_any_case<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Severity, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

impl CliConfig {
    /// Load from `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// A validator over the built-in rules minus `disabled_rules`.
    pub fn build_validator(&self) -> Validator {
        let mut registry = RuleRegistry::with_builtin_rules();
        for rule_id in &self.disabled_rules {
            let removed = registry.disable(rule_id);
            if removed == 0 {
                tracing::warn!(rule = %rule_id, "disabled rule is not registered");
            } else {
                tracing::info!(rule = %rule_id, registrations = removed, "rule disabled");
            }
        }
        Validator::new(Arc::new(registry))
    }
}
