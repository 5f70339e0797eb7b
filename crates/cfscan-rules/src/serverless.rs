//! # Lambda Rules
//!
//! Dead-letter configuration and plaintext secrets in environment variables.
//!
//! Secret detection is a heuristic: a variable whose name contains one of
//! [`SECRET_KEYWORDS`] and whose value is a literal scalar is reported
//! unless the value is empty or a dynamic reference (`{{resolve:...}}`),
//! which CloudFormation resolves from Secrets Manager or Parameter Store at
//! deploy time. Numbers and booleans count as literals: CloudFormation
//! passes them to the function as strings.
//!
//! This is best-effort. Only the value's leading text is examined, so a
//! reference nested inside `Fn::Sub` or `Fn::Join` is not recognized, and a
//! literal that merely starts with the marker is trusted.

use cfscan_core::{Finding, FindingKind, PropertyValue, Resource, RuleExecutionError, Severity};

use crate::registry::{Rule, RuleOutcome, RuleRegistry};

const LAMBDA_FUNCTION: &str = "AWS::Lambda::Function";
const SERVERLESS_FUNCTION: &str = "AWS::Serverless::Function";

/// Variable-name fragments that mark a value as sensitive (matched
/// case-insensitively).
pub const SECRET_KEYWORDS: &[&str] = &["PASSWORD", "SECRET", "API_KEY", "TOKEN", "CREDENTIAL"];

/// Prefix of a CloudFormation dynamic reference.
const DYNAMIC_REFERENCE_PREFIX: &str = "{{resolve:";

pub(crate) fn register(registry: &mut RuleRegistry) {
    registry.register(
        LAMBDA_FUNCTION,
        Rule::new(
            "lambda-dead-letter",
            "Functions should route failed asynchronous invocations to a dead-letter target",
            check_dead_letter,
        ),
    );
    for resource_type in [LAMBDA_FUNCTION, SERVERLESS_FUNCTION] {
        registry.register(
            resource_type,
            Rule::new(
                "lambda-plaintext-secret",
                "Environment variables must not hold literal secrets",
                check_plaintext_secrets,
            ),
        );
    }
}

fn check_dead_letter(resource: &Resource) -> RuleOutcome {
    if resource.property("DeadLetterConfig").is_some_and(cfscan_core::is_intrinsic)
        || resource.property_path(&["DeadLetterConfig", "TargetArn"]).is_some()
    {
        return Ok(Vec::new());
    }
    Ok(vec![Finding::new(
        resource,
        Severity::Low,
        FindingKind::LAMBDA_DLQ_MISSING,
        "Function has no dead-letter target (DeadLetterConfig.TargetArn)",
        "Set DeadLetterConfig.TargetArn to an SQS queue or SNS topic.",
    )])
}

fn is_sensitive_name(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    SECRET_KEYWORDS.iter().any(|k| upper.contains(k))
}

fn is_plaintext(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::String(s) => !s.is_empty() && !s.starts_with(DYNAMIC_REFERENCE_PREFIX),
        serde_json::Value::Number(_) | serde_json::Value::Bool(_) => true,
        _ => false,
    }
}

fn check_plaintext_secrets(resource: &Resource) -> RuleOutcome {
    let Some(variables) = resource.property_path(&["Environment", "Variables"]) else {
        return Ok(Vec::new());
    };
    let Some(variables) = variables.as_object() else {
        if cfscan_core::is_intrinsic(variables) {
            return Ok(Vec::new());
        }
        return Err(RuleExecutionError::new(
            "lambda-plaintext-secret",
            format!(
                "Environment.Variables must be a mapping, found {}",
                variables.shape_name()
            ),
        ));
    };

    let exposed: Vec<&str> = variables
        .iter()
        .filter(|(name, value)| is_sensitive_name(name) && is_plaintext(value))
        .map(|(name, _)| name.as_str())
        .collect();
    if exposed.is_empty() {
        return Ok(Vec::new());
    }
    // Names only; the values themselves never enter a finding.
    Ok(vec![Finding::new(
        resource,
        Severity::Critical,
        FindingKind::LAMBDA_HARDCODED_SECRET,
        format!(
            "Environment variables hold literal secret values: {}",
            exposed.join(", ")
        ),
        "Use a {{resolve:secretsmanager:...}} dynamic reference, or read the secret at runtime.",
    )])
}
