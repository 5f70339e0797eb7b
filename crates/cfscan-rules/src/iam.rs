//! # IAM Wildcard Rule
//!
//! Flags `Allow` statements granting every action (`"Action": "*"`) or
//! scoping to every resource (`"Resource": "*"`). Service-scoped wildcards
//! such as `s3:*` are not flagged; only the bare `*` is.
//!
//! Roles, users, and groups carry inline policies under
//! `Policies[].PolicyDocument`; standalone policies carry a single
//! `PolicyDocument`.

use cfscan_core::{
    is_intrinsic, Finding, FindingKind, PropertyValue, Resource, RuleExecutionError, Severity,
};

use crate::policy;
use crate::registry::{Rule, RuleOutcome, RuleRegistry};

pub const RULE_ID: &str = "iam-wildcard";

/// Types whose inline `Policies` list is inspected.
const PRINCIPAL_TYPES: &[&str] = &["AWS::IAM::Role", "AWS::IAM::User", "AWS::IAM::Group"];

/// Types carrying one `PolicyDocument`.
const POLICY_TYPES: &[&str] = &["AWS::IAM::Policy", "AWS::IAM::ManagedPolicy"];

pub(crate) fn register(registry: &mut RuleRegistry) {
    for resource_type in PRINCIPAL_TYPES.iter().chain(POLICY_TYPES) {
        registry.register(
            *resource_type,
            Rule::new(
                RULE_ID,
                "Allow statements must not grant Action \"*\" or Resource \"*\"",
                check_wildcards,
            ),
        );
    }
}

/// Labelled policy documents attached to `resource`.
fn attached_documents(
    resource: &Resource,
) -> Result<Vec<(String, &serde_json::Value)>, RuleExecutionError> {
    if POLICY_TYPES.contains(&resource.resource_type()) {
        return Ok(resource
            .property("PolicyDocument")
            .map(|doc| vec![("PolicyDocument".to_string(), doc)])
            .unwrap_or_default());
    }

    let Some(policies) = resource.property("Policies") else {
        return Ok(Vec::new());
    };
    if is_intrinsic(policies) {
        return Ok(Vec::new());
    }
    let mut documents = Vec::new();
    for (index, policy) in policies.items().into_iter().enumerate() {
        if is_intrinsic(policy) {
            continue;
        }
        if !policy.is_object() {
            return Err(RuleExecutionError::new(
                RULE_ID,
                format!("Policies[{index}] must be a mapping, found {}", policy.shape_name()),
            ));
        }
        let name = policy
            .prop("PolicyName")
            .and_then(PropertyValue::as_text)
            .map(|n| format!("policy '{n}'"))
            .unwrap_or_else(|| format!("Policies[{index}]"));
        if let Some(doc) = policy.prop("PolicyDocument") {
            documents.push((name, doc));
        }
    }
    Ok(documents)
}

fn check_wildcards(resource: &Resource) -> RuleOutcome {
    let mut wildcard_actions = Vec::new();
    let mut wildcard_resources = Vec::new();

    for (name, raw) in attached_documents(resource)? {
        let Some(doc) = policy::document(raw).map_err(|e| RuleExecutionError::new(RULE_ID, e))?
        else {
            continue;
        };
        let statements = policy::statements(&doc)
            .map_err(|e| RuleExecutionError::new(RULE_ID, format!("{name}: {e}")))?;
        for stmt in statements.iter().filter(|s| s.is_allow()) {
            let any_action = stmt.action().is_some_and(|a| a.contains_text("*"));
            let any_resource = stmt.resource().is_some_and(|r| r.contains_text("*"));
            if any_action {
                wildcard_actions.push(format!("{name} {}", stmt.label()));
            } else if any_resource {
                wildcard_resources.push(format!("{name} {}", stmt.label()));
            }
        }
    }

    let mut findings = Vec::new();
    if !wildcard_actions.is_empty() {
        findings.push(Finding::new(
            resource,
            Severity::Critical,
            FindingKind::IAM_WILDCARD_ACTION,
            format!(
                "Allow statement grants every action (Action \"*\"): {}",
                wildcard_actions.join(", ")
            ),
            "List the specific actions the principal needs instead of \"*\".",
        ));
    }
    if !wildcard_resources.is_empty() {
        findings.push(Finding::new(
            resource,
            Severity::High,
            FindingKind::IAM_WILDCARD_RESOURCE,
            format!(
                "Allow statement applies to every resource (Resource \"*\"): {}",
                wildcard_resources.join(", ")
            ),
            "Scope Resource to the ARNs the actions are meant to touch.",
        ));
    }
    Ok(findings)
}
