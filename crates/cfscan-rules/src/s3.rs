//! # S3 Rules
//!
//! Bucket hardening (public access block, ACLs, default encryption,
//! versioning) and public grants in bucket policies.

use cfscan_core::{
    is_intrinsic, Finding, FindingKind, PropertyValue, Resource, RuleExecutionError, Severity,
};
use serde_json::Value;

use crate::policy;
use crate::registry::{Rule, RuleOutcome, RuleRegistry};

const BUCKET: &str = "AWS::S3::Bucket";
const BUCKET_POLICY: &str = "AWS::S3::BucketPolicy";

/// The four switches of `PublicAccessBlockConfiguration`; all must be `true`.
const PUBLIC_ACCESS_SWITCHES: [&str; 4] = [
    "BlockPublicAcls",
    "BlockPublicPolicy",
    "IgnorePublicAcls",
    "RestrictPublicBuckets",
];

/// Canned ACLs that grant access to everyone.
const PUBLIC_ACLS: [&str; 2] = ["PublicRead", "PublicReadWrite"];

pub(crate) fn register(registry: &mut RuleRegistry) {
    registry.register(
        BUCKET,
        Rule::new(
            "s3-public-access",
            "Buckets must block public access and must not use public canned ACLs",
            check_public_access,
        ),
    );
    registry.register(
        BUCKET,
        Rule::new(
            "s3-encryption",
            "Buckets must declare default encryption",
            check_encryption,
        ),
    );
    registry.register(
        BUCKET,
        Rule::new(
            "s3-versioning",
            "Buckets should enable versioning",
            check_versioning,
        ),
    );
    registry.register(
        BUCKET_POLICY,
        Rule::new(
            "s3-bucket-policy-public",
            "Bucket policies must not allow anonymous principals without a condition",
            check_bucket_policy,
        ),
    );
}

fn check_public_access(resource: &Resource) -> RuleOutcome {
    let mut findings = Vec::new();

    match resource.property("PublicAccessBlockConfiguration") {
        Some(config) if is_intrinsic(config) => {}
        Some(config) => {
            let open: Vec<&str> = PUBLIC_ACCESS_SWITCHES
                .iter()
                .copied()
                .filter(|switch| match config.prop(switch) {
                    Some(v) if is_intrinsic(v) => false,
                    Some(v) => v.as_flag() != Some(true),
                    None => true,
                })
                .collect();
            if !open.is_empty() {
                findings.push(Finding::new(
                    resource,
                    Severity::High,
                    FindingKind::S3_PUBLIC_ACCESS_NOT_BLOCKED,
                    format!(
                        "PublicAccessBlockConfiguration leaves public access open: {} not true",
                        open.join(", ")
                    ),
                    "Set BlockPublicAcls, BlockPublicPolicy, IgnorePublicAcls and \
                     RestrictPublicBuckets to true.",
                ));
            }
        }
        None => findings.push(Finding::new(
            resource,
            Severity::High,
            FindingKind::S3_PUBLIC_ACCESS_NOT_BLOCKED,
            "Bucket has no PublicAccessBlockConfiguration",
            "Add a PublicAccessBlockConfiguration with all four settings true.",
        )),
    }

    if let Some(acl) = resource
        .property("AccessControl")
        .and_then(PropertyValue::as_text)
        .filter(|acl| PUBLIC_ACLS.contains(acl))
    {
        findings.push(Finding::new(
            resource,
            Severity::High,
            FindingKind::S3_PUBLIC_ACL,
            format!("Bucket uses public canned ACL {acl}"),
            "Remove AccessControl or use Private; grant access through scoped bucket policies.",
        ));
    }

    Ok(findings)
}

fn check_encryption(resource: &Resource) -> RuleOutcome {
    let configured = resource
        .property("BucketEncryption")
        .is_some_and(|enc| {
            is_intrinsic(enc)
                || enc
                    .prop("ServerSideEncryptionConfiguration")
                    .is_some_and(|rules| !rules.items().is_empty())
        });
    if configured {
        return Ok(Vec::new());
    }
    Ok(vec![Finding::new(
        resource,
        Severity::Medium,
        FindingKind::S3_ENCRYPTION_MISSING,
        "Bucket declares no default encryption (BucketEncryption)",
        "Add BucketEncryption with an SSE-S3 or SSE-KMS ServerSideEncryptionConfiguration.",
    )])
}

fn check_versioning(resource: &Resource) -> RuleOutcome {
    let status = resource.property_path(&["VersioningConfiguration", "Status"]);
    match status {
        Some(v) if is_intrinsic(v) => Ok(Vec::new()),
        Some(v) if v.as_text() == Some("Enabled") => Ok(Vec::new()),
        other => {
            let described = other
                .and_then(PropertyValue::as_text)
                .map(|s| format!("VersioningConfiguration.Status is {s}"))
                .unwrap_or_else(|| "VersioningConfiguration is not set".to_string());
            Ok(vec![Finding::new(
                resource,
                Severity::Low,
                FindingKind::S3_VERSIONING_DISABLED,
                format!("Bucket versioning is not enabled: {described}"),
                "Set VersioningConfiguration.Status to Enabled.",
            )])
        }
    }
}

/// `"*"` or `{"AWS": "*"}` (the latter also inside a list).
fn is_anonymous_principal(principal: &Value) -> bool {
    principal.as_text() == Some("*")
        || principal
            .prop("AWS")
            .is_some_and(|aws| aws.contains_text("*"))
}

fn check_bucket_policy(resource: &Resource) -> RuleOutcome {
    let Some(raw) = resource.property("PolicyDocument") else {
        return Ok(Vec::new());
    };
    let Some(doc) =
        policy::document(raw).map_err(|e| RuleExecutionError::new("s3-bucket-policy-public", e))?
    else {
        return Ok(Vec::new());
    };
    let statements = policy::statements(&doc)
        .map_err(|e| RuleExecutionError::new("s3-bucket-policy-public", e))?;

    let public: Vec<String> = statements
        .iter()
        .filter(|s| s.is_allow() && !s.has_condition())
        .filter(|s| s.principal().is_some_and(is_anonymous_principal))
        .map(|s| s.label())
        .collect();
    if public.is_empty() {
        return Ok(Vec::new());
    }

    let bucket = resource
        .property("Bucket")
        .and_then(PropertyValue::as_text)
        .map(|b| format!(" on bucket {b}"))
        .unwrap_or_default();
    Ok(vec![Finding::new(
        resource,
        Severity::High,
        FindingKind::S3_BUCKET_POLICY_PUBLIC,
        format!(
            "Policy{bucket} allows any principal without a condition: {}",
            public.join(", ")
        ),
        "Restrict Principal to specific accounts or roles, or add a Condition such as \
         aws:SourceVpce.",
    )])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{has_kind, kinds, resource};
    use serde_json::json;

    fn locked_down() -> Value {
        json!({
            "PublicAccessBlockConfiguration": {
                "BlockPublicAcls": true,
                "BlockPublicPolicy": true,
                "IgnorePublicAcls": true,
                "RestrictPublicBuckets": true
            },
            "BucketEncryption": {
                "ServerSideEncryptionConfiguration": [
                    {"ServerSideEncryptionByDefault": {"SSEAlgorithm": "aws:kms"}}
                ]
            },
            "VersioningConfiguration": {"Status": "Enabled"}
        })
    }

    #[test]
    fn missing_public_access_block_is_high() {
        let findings = check_public_access(&resource(BUCKET, json!({}))).unwrap();
        assert_eq!(kinds(&findings), vec!["S3_PUBLIC_ACCESS_NOT_BLOCKED"]);
        assert_eq!(findings[0].severity, Severity::High);
    }

    #[test]
    fn fully_blocked_bucket_is_clean() {
        let bucket = resource(BUCKET, locked_down());
        assert!(check_public_access(&bucket).unwrap().is_empty());
        assert!(check_encryption(&bucket).unwrap().is_empty());
        assert!(check_versioning(&bucket).unwrap().is_empty());
    }

    #[test]
    fn partial_block_lists_open_switches() {
        let bucket = resource(
            BUCKET,
            json!({"PublicAccessBlockConfiguration": {
                "BlockPublicAcls": "true",
                "BlockPublicPolicy": false,
                "IgnorePublicAcls": true
            }}),
        );
        let findings = check_public_access(&bucket).unwrap();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].description.contains("BlockPublicPolicy"));
        assert!(findings[0].description.contains("RestrictPublicBuckets"));
        assert!(!findings[0].description.contains("IgnorePublicAcls"));
    }

    #[test]
    fn public_acl_is_flagged() {
        let mut props = locked_down();
        props["AccessControl"] = json!("PublicReadWrite");
        let findings = check_public_access(&resource(BUCKET, props)).unwrap();
        assert_eq!(kinds(&findings), vec!["S3_PUBLIC_ACL"]);

        let mut props = locked_down();
        props["AccessControl"] = json!("Private");
        assert!(check_public_access(&resource(BUCKET, props)).unwrap().is_empty());
    }

    #[test]
    fn intrinsic_switch_is_not_flagged() {
        let bucket = resource(
            BUCKET,
            json!({"PublicAccessBlockConfiguration": {
                "BlockPublicAcls": {"Ref": "Block"},
                "BlockPublicPolicy": true,
                "IgnorePublicAcls": true,
                "RestrictPublicBuckets": true
            }}),
        );
        assert!(check_public_access(&bucket).unwrap().is_empty());
    }

    #[test]
    fn missing_encryption_is_medium() {
        let findings = check_encryption(&resource(BUCKET, json!({}))).unwrap();
        assert_eq!(kinds(&findings), vec!["S3_ENCRYPTION_MISSING"]);
        assert_eq!(findings[0].severity, Severity::Medium);

        let empty_rules = resource(
            BUCKET,
            json!({"BucketEncryption": {"ServerSideEncryptionConfiguration": []}}),
        );
        assert_eq!(check_encryption(&empty_rules).unwrap().len(), 1);
    }

    #[test]
    fn suspended_versioning_is_low() {
        let bucket = resource(BUCKET, json!({"VersioningConfiguration": {"Status": "Suspended"}}));
        let findings = check_versioning(&bucket).unwrap();
        assert_eq!(findings[0].severity, Severity::Low);
        assert!(findings[0].description.contains("Suspended"));
        assert_eq!(check_versioning(&resource(BUCKET, json!({}))).unwrap().len(), 1);
    }

    #[test]
    fn anonymous_bucket_policy_is_flagged() {
        let policy = resource(
            BUCKET_POLICY,
            json!({
                "Bucket": "site-assets",
                "PolicyDocument": {"Statement": [
                    {
                        "Sid": "PublicRead",
                        "Effect": "Allow",
                        "Principal": "*",
                        "Action": "s3:GetObject",
                        "Resource": "arn:aws:s3:::site-assets/*"
                    }
                ]}
            }),
        );
        let findings = check_bucket_policy(&policy).unwrap();
        assert!(has_kind(&findings, &FindingKind::S3_BUCKET_POLICY_PUBLIC));
        assert!(findings[0].description.contains("site-assets"));
        assert!(findings[0].description.contains("'PublicRead'"));
    }

    #[test]
    fn aws_star_principal_is_anonymous() {
        assert!(is_anonymous_principal(&json!({"AWS": "*"})));
        assert!(is_anonymous_principal(&json!({"AWS": ["*"]})));
        assert!(!is_anonymous_principal(&json!({"AWS": "arn:aws:iam::123456789012:root"})));
        assert!(!is_anonymous_principal(&json!({"Service": "cloudfront.amazonaws.com"})));
    }

    #[test]
    fn conditioned_or_denied_statements_are_not_flagged() {
        let policy = resource(
            BUCKET_POLICY,
            json!({"PolicyDocument": {"Statement": [
                {"Effect": "Allow", "Principal": "*", "Action": "s3:GetObject",
                 "Condition": {"StringEquals": {"aws:SourceVpce": "vpce-1a2b3c4d"}}},
                {"Effect": "Deny", "Principal": "*", "Action": "s3:*",
                 "Condition": {"Bool": {"aws:SecureTransport": "false"}}}
            ]}}),
        );
        assert!(check_bucket_policy(&policy).unwrap().is_empty());
    }
}
