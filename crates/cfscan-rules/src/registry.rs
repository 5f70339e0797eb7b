//! # Rule Registry
//!
//! Maps a resource type tag to the ordered list of rules that inspect it.
//! Unknown types have no rules; they are unchecked, never an error.
//!
//! ## Lifecycle
//!
//! The registry is built once at startup (built-in rules, extension rules,
//! then configuration-driven [`RuleRegistry::disable`] calls) and is shared
//! read-only afterwards. It is `Send + Sync`; wrap it in an `Arc` to share
//! it across concurrent validations.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use cfscan_core::{Finding, Resource, RuleExecutionError};

use crate::{compute, database, iam, network, s3, serverless};

/// What a rule returns for one resource.
pub type RuleOutcome = Result<Vec<Finding>, RuleExecutionError>;

type CheckFn = dyn Fn(&Resource) -> RuleOutcome + Send + Sync;

/// A named check function.
#[derive(Clone)]
pub struct Rule {
    id: &'static str,
    summary: &'static str,
    check: Arc<CheckFn>,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

impl Rule {
    /// Create a rule from any thread-safe closure or function.
    pub fn new<F>(id: &'static str, summary: &'static str, check: F) -> Self
    where
        F: Fn(&Resource) -> RuleOutcome + Send + Sync + 'static,
    {
        Self {
            id,
            summary,
            check: Arc::new(check),
        }
    }

    /// Stable rule identifier, e.g. `iam-wildcard`.
    pub fn id(&self) -> &'static str {
        self.id
    }

    /// One-line description of what the rule checks.
    pub fn summary(&self) -> &'static str {
        self.summary
    }

    /// Run the rule against one resource.
    pub fn check(&self, resource: &Resource) -> RuleOutcome {
        (self.check)(resource)
    }
}

/// One line of the rule catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CatalogEntry {
    pub resource_type: String,
    pub rule_id: &'static str,
    pub summary: &'static str,
}

/// Mapping from resource type tag to its ordered rules.
#[derive(Debug, Default, Clone)]
pub struct RuleRegistry {
    rules: HashMap<String, Vec<Rule>>,
}

impl RuleRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in rule.
    pub fn with_builtin_rules() -> Self {
        let mut registry = Self::new();
        iam::register(&mut registry);
        s3::register(&mut registry);
        network::register(&mut registry);
        database::register(&mut registry);
        compute::register(&mut registry);
        serverless::register(&mut registry);
        tracing::debug!(
            resource_types = registry.rules.len(),
            registrations = registry.len(),
            "registered built-in rules"
        );
        registry
    }

    /// Add `rule` to the rules for `resource_type`, after any already there.
    ///
    /// Registering the same rule id twice for one type is a no-op and
    /// returns `false`.
    pub fn register(&mut self, resource_type: impl Into<String>, rule: Rule) -> bool {
        let resource_type = resource_type.into();
        let rules = self.rules.entry(resource_type.clone()).or_default();
        if rules.iter().any(|r| r.id == rule.id) {
            tracing::warn!(
                resource_type = %resource_type,
                rule = rule.id,
                "rule already registered for resource type; ignoring duplicate"
            );
            return false;
        }
        rules.push(rule);
        true
    }

    /// Rules for `resource_type` in registration order. Empty for unknown types.
    pub fn rules_for(&self, resource_type: &str) -> &[Rule] {
        self.rules
            .get(resource_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Remove `rule_id` from every resource type. Returns how many
    /// registrations were removed.
    pub fn disable(&mut self, rule_id: &str) -> usize {
        let mut removed = 0;
        for rules in self.rules.values_mut() {
            let before = rules.len();
            rules.retain(|r| r.id != rule_id);
            removed += before - rules.len();
        }
        self.rules.retain(|_, rules| !rules.is_empty());
        removed
    }

    /// Whether any resource type has a rule with this id.
    pub fn contains_rule(&self, rule_id: &str) -> bool {
        self.rules
            .values()
            .any(|rules| rules.iter().any(|r| r.id == rule_id))
    }

    /// Every registration, sorted by resource type then rule id.
    pub fn catalog(&self) -> Vec<CatalogEntry> {
        let mut entries: Vec<CatalogEntry> = self
            .rules
            .iter()
            .flat_map(|(resource_type, rules)| {
                rules.iter().map(move |r| CatalogEntry {
                    resource_type: resource_type.clone(),
                    rule_id: r.id,
                    summary: r.summary,
                })
            })
            .collect();
        entries.sort();
        entries
    }

    /// Resource types with at least one rule, sorted.
    pub fn resource_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Total number of (resource type, rule) registrations.
    pub fn len(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
