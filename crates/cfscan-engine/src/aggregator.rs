//! # Aggregator
//!
//! Walks a template's resources in document order and runs, for each one,
//! the rules registered for its type in registration order.
//!
//! ## Fault Isolation
//!
//! A rule that returns [`RuleExecutionError`] or panics does not abort the
//! pass. Its failure is recorded as one MEDIUM `INTERNAL_RULE_ERROR` finding
//! naming the rule and the resource, and the remaining rules and resources
//! still run. One broken rule never hides another rule's findings.
//!
//! ## Ordering
//!
//! Findings are concatenated in (resource order, rule order, emission
//! order). Within one rule invocation a repeated finding kind for the same
//! resource is dropped, keeping the first.

use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use cfscan_core::{
    Finding, FindingKind, Resource, RuleExecutionError, Severity, Template, Timestamp,
};
use cfscan_rules::{Rule, RuleRegistry};

use crate::report::{ReportBuilder, ValidationResult};

/// Runs registered rules over templates. Cheap to clone; share freely
/// across threads.
#[derive(Debug, Clone)]
pub struct Validator {
    registry: Arc<RuleRegistry>,
}

impl Validator {
    pub fn new(registry: Arc<RuleRegistry>) -> Self {
        Self { registry }
    }

    /// A validator over every built-in rule.
    pub fn with_builtin_rules() -> Self {
        Self::new(Arc::new(RuleRegistry::with_builtin_rules()))
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Validate `template`, stamping the result with the current time.
    pub fn validate(&self, template: &Template) -> ValidationResult {
        self.validate_at(template, Timestamp::now())
    }

    /// Validate `template`, stamping the result with `timestamp`.
    pub fn validate_at(&self, template: &Template, timestamp: Timestamp) -> ValidationResult {
        let findings = self.findings(template);
        let result = ReportBuilder::new(template.id().clone())
            .timestamp(timestamp)
            .findings(findings)
            .build();

        tracing::info!(
            template_id = %template.id(),
            resources = template.len(),
            status = %result.status,
            counts = %result.severity_counts,
            "template validated"
        );
        result
    }

    /// All findings for `template`, in report order.
    pub fn findings(&self, template: &Template) -> Vec<Finding> {
        let mut findings = Vec::new();
        for resource in template.resources() {
            let rules = self.registry.rules_for(resource.resource_type());
            if rules.is_empty() {
                tracing::trace!(
                    resource = resource.name(),
                    resource_type = resource.resource_type(),
                    "no rules for resource type"
                );
                continue;
            }
            let before = findings.len();
            for rule in rules {
                findings.extend(run_rule(rule, resource));
            }
            tracing::debug!(
                template_id = %template.id(),
                resource = resource.name(),
                resource_type = resource.resource_type(),
                rules = rules.len(),
                findings = findings.len() - before,
                "resource checked"
            );
        }
        findings
    }
}

/// Run one rule against one resource, containing errors and panics.
fn run_rule(rule: &Rule, resource: &Resource) -> Vec<Finding> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| rule.check(resource)))
        .unwrap_or_else(|payload| {
            Err(RuleExecutionError::new(
                rule.id(),
                format!("panicked: {}", panic_message(payload.as_ref())),
            ))
        });

    match outcome {
        Ok(findings) => dedupe_kinds(findings),
        Err(error) => {
            tracing::warn!(
                rule = rule.id(),
                resource = resource.name(),
                resource_type = resource.resource_type(),
                error = %error,
                "rule failed; recording internal error finding"
            );
            vec![internal_error(resource, &error)]
        }
    }
}

fn dedupe_kinds(mut findings: Vec<Finding>) -> Vec<Finding> {
    let mut seen: HashSet<FindingKind> = HashSet::new();
    findings.retain(|f| seen.insert(f.finding_kind.clone()));
    findings
}

fn internal_error(resource: &Resource, error: &RuleExecutionError) -> Finding {
    Finding::new(
        resource,
        Severity::Medium,
        FindingKind::INTERNAL_RULE_ERROR,
        format!("{error}; resource '{}' was not fully checked", resource.name()),
        "Check the resource's property shapes; if they are valid, report the rule failure.",
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
