//! # EC2 Rules
//!
//! Instance metadata service v2 enforcement and EBS volume encryption.

use cfscan_core::{is_intrinsic, Finding, FindingKind, PropertyValue, Resource, Severity};
use serde_json::Value;

use crate::registry::{Rule, RuleOutcome, RuleRegistry};

const INSTANCE: &str = "AWS::EC2::Instance";
const LAUNCH_TEMPLATE: &str = "AWS::EC2::LaunchTemplate";
const VOLUME: &str = "AWS::EC2::Volume";

pub(crate) fn register(registry: &mut RuleRegistry) {
    for resource_type in [INSTANCE, LAUNCH_TEMPLATE] {
        registry.register(
            resource_type,
            Rule::new(
                "ec2-imdsv2",
                "Instance metadata must require session tokens (IMDSv2)",
                check_imdsv2,
            ),
        );
    }
    registry.register(
        VOLUME,
        Rule::new(
            "ebs-encryption",
            "EBS volumes must be encrypted",
            check_volume_encryption,
        ),
    );
}

fn metadata_options(resource: &Resource) -> Option<&Value> {
    if resource.resource_type() == LAUNCH_TEMPLATE {
        resource.property_path(&["LaunchTemplateData", "MetadataOptions"])
    } else {
        resource.property("MetadataOptions")
    }
}

fn check_imdsv2(resource: &Resource) -> RuleOutcome {
    // An instance launched from a template takes its metadata options there.
    if resource.resource_type() == INSTANCE && resource.property("LaunchTemplate").is_some() {
        return Ok(Vec::new());
    }

    let options = metadata_options(resource);
    if options.is_some_and(is_intrinsic) {
        return Ok(Vec::new());
    }
    let endpoint_disabled = options
        .and_then(|o| o.prop("HttpEndpoint"))
        .and_then(PropertyValue::as_text)
        .is_some_and(|e| e.eq_ignore_ascii_case("disabled"));
    if endpoint_disabled {
        return Ok(Vec::new());
    }

    let tokens = options.and_then(|o| o.prop("HttpTokens"));
    let described = match tokens {
        Some(v) if is_intrinsic(v) => return Ok(Vec::new()),
        Some(v) if v.as_text() == Some("required") => return Ok(Vec::new()),
        Some(v) => format!(
            "MetadataOptions.HttpTokens is {}",
            v.as_text().unwrap_or(v.shape_name())
        ),
        None => "MetadataOptions.HttpTokens is not set (IMDSv1 allowed)".to_string(),
    };
    Ok(vec![Finding::new(
        resource,
        Severity::High,
        FindingKind::EC2_IMDSV2_NOT_ENFORCED,
        format!("Instance metadata service v1 is reachable: {described}"),
        "Set MetadataOptions.HttpTokens to required.",
    )])
}

fn check_volume_encryption(resource: &Resource) -> RuleOutcome {
    let encrypted = match resource.property("Encrypted") {
        Some(v) if is_intrinsic(v) => true,
        Some(v) => v.as_flag() == Some(true),
        None => false,
    };
    if encrypted {
        return Ok(Vec::new());
    }
    Ok(vec![Finding::new(
        resource,
        Severity::High,
        FindingKind::EBS_VOLUME_UNENCRYPTED,
        "EBS volume is not encrypted (Encrypted not true)",
        "Set Encrypted to true, optionally with a customer managed KmsKeyId.",
    )])
}
