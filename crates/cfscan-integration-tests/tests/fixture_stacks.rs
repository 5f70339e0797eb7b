//! Full-pipeline tests over realistic fixture templates.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cfscan_cli::config::CliConfig;
use cfscan_cli::validate::{collect_templates, exit_code, validate_file};
use cfscan_core::{FindingKind, RuleExecutionError, Severity, Timestamp};
use cfscan_engine::{validate_document_at, Status, ValidationResult, Validator};
use cfscan_rules::{Rule, RuleRegistry};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn validate_fixture(name: &str) -> ValidationResult {
    validate_file(&Validator::with_builtin_rules(), &fixture(name), None).unwrap()
}

fn pairs(result: &ValidationResult) -> Vec<(&str, &str)> {
    result
        .findings
        .iter()
        .map(|f| (f.resource_name.as_str(), f.finding_kind.as_str()))
        .collect()
}

#[test]
fn insecure_stack_reports_every_issue_in_document_order() {
    let result = validate_fixture("insecure_stack.yaml");
    assert_eq!(result.status, Status::Failed);
    assert_eq!(
        pairs(&result),
        vec![
            ("AppRole", "IAM_WILDCARD_ACTION"),
            ("DataBucket", "S3_PUBLIC_ACCESS_NOT_BLOCKED"),
            ("DataBucket", "S3_PUBLIC_ACL"),
            ("DataBucket", "S3_ENCRYPTION_MISSING"),
            ("DataBucket", "S3_VERSIONING_DISABLED"),
            ("DataBucketPolicy", "S3_BUCKET_POLICY_PUBLIC"),
            ("BastionSg", "SG_UNRESTRICTED_SSH"),
            ("BastionSg", "SG_UNRESTRICTED_EGRESS"),
            ("Sessions", "DYNAMODB_PITR_DISABLED"),
            ("Database", "RDS_BACKUP_RETENTION_INSUFFICIENT"),
            ("Database", "RDS_STORAGE_UNENCRYPTED"),
            ("Database", "RDS_PUBLICLY_ACCESSIBLE"),
            ("Worker", "EC2_IMDSV2_NOT_ENFORCED"),
            ("Scratch", "EBS_VOLUME_UNENCRYPTED"),
            ("Handler", "LAMBDA_DLQ_MISSING"),
            ("Handler", "LAMBDA_HARDCODED_SECRET"),
        ]
    );
    assert_eq!(
        result.severity_counts.to_string(),
        "2 CRITICAL, 8 HIGH, 4 MEDIUM, 2 LOW"
    );
}

#[test]
fn hardened_stack_passes() {
    let result = validate_fixture("hardened_stack.json");
    assert!(result.findings.is_empty(), "{:#?}", result.findings);
    assert_eq!(result.status, Status::Passed);
}

#[test]
fn short_form_tags_produce_failed_record() {
    let result = validate_fixture("short_form.yaml");
    assert_eq!(result.status, Status::Failed);
    assert!(result.is_parse_failure());
    assert!(result.findings[0].description.contains("!Sub"));
    assert!(result.findings[0]
        .description
        .contains("Resources.Bucket.Properties.BucketName"));
}

#[test]
fn fixture_directory_exit_code_reflects_parse_failure() {
    let files = collect_templates(&[fixture("")]).unwrap();
    assert_eq!(files.len(), 3);
    let validator = Validator::with_builtin_rules();
    let results: Vec<ValidationResult> = files
        .iter()
        .map(|p| validate_file(&validator, p, None).unwrap())
        .collect();
    assert_eq!(exit_code(&results, Severity::High), 2);
    let parsed: Vec<ValidationResult> =
        results.into_iter().filter(|r| !r.is_parse_failure()).collect();
    assert_eq!(exit_code(&parsed, Severity::High), 1);
}

#[test]
fn disabling_rules_through_config_drops_their_findings() {
    let config = CliConfig::from_yaml(concat!(
        "disabled_rules:\n",
        "  - s3-versioning\n",
        "  - lambda-dead-letter\n",
        "  - sg-egress\n",
        "  - dynamodb-protection\n",
        "  - s3-encryption\n",
        "  - rds-protection\n",
    ))
    .unwrap();
    let validator = config.build_validator();
    let result = validate_file(&validator, &fixture("insecure_stack.yaml"), None).unwrap();
    assert_eq!(result.severity_counts.low, 0);
    assert_eq!(result.severity_counts.medium, 0);
    assert!(result.findings_of(&FindingKind::RDS_PUBLICLY_ACCESSIBLE).next().is_none());
    assert_eq!(result.status, Status::Failed);
}

#[test]
fn serialized_record_has_the_store_shape() {
    let bytes = std::fs::read(fixture("insecure_stack.yaml")).unwrap();
    let at = Timestamp::parse("2024-06-01T00:00:00Z").unwrap();
    let result = validate_document_at(
        &Validator::with_builtin_rules(),
        &bytes,
        "inbox/insecure_stack.yaml",
        None,
        at,
    )
    .unwrap();
    let json: serde_json::Value = serde_json::from_str(&result.to_json_pretty().unwrap()).unwrap();

    assert_eq!(json["templateId"], "inbox/insecure_stack.yaml");
    assert_eq!(json["timestamp"], "2024-06-01T00:00:00Z");
    assert_eq!(json["status"], "FAILED");
    assert_eq!(json["severityCounts"]["CRITICAL"], 2);
    let first = &json["findings"][0];
    for key in [
        "resourceName",
        "resourceType",
        "severity",
        "findingKind",
        "description",
        "recommendation",
    ] {
        assert!(first.get(key).is_some(), "missing {key}");
    }
    // Secret values never leak into a record.
    assert!(!json.to_string().contains("hunter2"));
}

#[test]
fn repeated_resource_name_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("shadowed.json"),
        r#"{"Resources": {
            "Data": {"Type": "AWS::S3::Bucket", "Properties": {"AccessControl": "PublicReadWrite"}},
            "Data": {"Type": "AWS::SQS::Queue"}
        }}"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("queue.yaml"),
        "Resources:\n  Jobs:\n    Type: AWS::SQS::Queue\n",
    )
    .unwrap();

    let files = collect_templates(&[dir.path().to_path_buf()]).unwrap();
    let validator = Validator::with_builtin_rules();
    let results: Vec<ValidationResult> = files
        .iter()
        .map(|p| validate_file(&validator, p, None).unwrap())
        .collect();

    let shadowed = results
        .iter()
        .find(|r| r.template_id.as_str().ends_with("shadowed.json"))
        .unwrap();
    assert!(shadowed.is_parse_failure());
    assert!(shadowed.findings[0].description.contains("Data"));
    assert_eq!(exit_code(&results, Severity::Critical), 2);
}

#[test]
fn failing_custom_rule_is_contained_alongside_builtin_rules() {
    let mut registry = RuleRegistry::with_builtin_rules();
    registry.register(
        "AWS::S3::Bucket",
        Rule::new("bucket-naming", "Buckets follow the naming scheme", |_| {
            Err(RuleExecutionError::new("bucket-naming", "naming table unavailable"))
        }),
    );
    let validator = Validator::new(Arc::new(registry));
    let result = validate_file(&validator, &fixture("insecure_stack.yaml"), None).unwrap();

    let internal: Vec<_> = result.findings_of(&FindingKind::INTERNAL_RULE_ERROR).collect();
    assert_eq!(internal.len(), 1);
    assert_eq!(internal[0].resource_name, "DataBucket");
    assert_eq!(internal[0].severity, Severity::Medium);
    assert!(internal[0].description.contains("bucket-naming"));
    // The built-in findings are all still there.
    assert_eq!(result.findings.len(), 17);
    assert_eq!(result.severity_counts.medium, 5);
}
