//! # Database Protection Rules
//!
//! DynamoDB point-in-time recovery and encryption; RDS backup retention,
//! storage encryption, and public accessibility.

use cfscan_core::{is_intrinsic, Finding, FindingKind, PropertyValue, Resource, Severity};

use crate::registry::{Rule, RuleOutcome, RuleRegistry};

const DYNAMODB_TABLE: &str = "AWS::DynamoDB::Table";
const RDS_INSTANCE: &str = "AWS::RDS::DBInstance";
const RDS_CLUSTER: &str = "AWS::RDS::DBCluster";

/// Minimum acceptable retention, in days, for PITR windows and RDS backups.
pub const MIN_RETENTION_DAYS: i64 = 7;

/// Retention RDS applies when `BackupRetentionPeriod` is omitted.
const RDS_DEFAULT_RETENTION_DAYS: i64 = 1;

pub(crate) fn register(registry: &mut RuleRegistry) {
    registry.register(
        DYNAMODB_TABLE,
        Rule::new(
            "dynamodb-protection",
            "Tables must enable point-in-time recovery and keep server-side encryption on",
            check_dynamodb,
        ),
    );
    for resource_type in [RDS_INSTANCE, RDS_CLUSTER] {
        registry.register(
            resource_type,
            Rule::new(
                "rds-protection",
                "Databases must retain backups for a week, encrypt storage, and stay private",
                check_rds,
            ),
        );
    }
}

fn check_dynamodb(resource: &Resource) -> RuleOutcome {
    let mut findings = Vec::new();

    let pitr = resource.property("PointInTimeRecoverySpecification");
    let enabled = match pitr {
        Some(p) if is_intrinsic(p) => Some(p),
        _ => pitr.and_then(|p| p.prop("PointInTimeRecoveryEnabled")),
    };
    match enabled {
        Some(v) if is_intrinsic(v) => {}
        Some(v) if v.as_flag() == Some(true) => {
            let period = pitr.and_then(|p| p.prop("RecoveryPeriodInDays"));
            if let Some(days) = period.and_then(PropertyValue::as_integer) {
                if days < MIN_RETENTION_DAYS {
                    findings.push(Finding::new(
                        resource,
                        Severity::Medium,
                        FindingKind::DYNAMODB_PITR_PERIOD_SHORT,
                        format!(
                            "Point-in-time recovery window is {days} days, \
                             below {MIN_RETENTION_DAYS}"
                        ),
                        "Raise RecoveryPeriodInDays to at least 7 (the default is 35).",
                    ));
                }
            }
        }
        _ => findings.push(Finding::new(
            resource,
            Severity::Medium,
            FindingKind::DYNAMODB_PITR_DISABLED,
            "Point-in-time recovery is not enabled",
            "Set PointInTimeRecoverySpecification.PointInTimeRecoveryEnabled to true.",
        )),
    }

    let sse = resource.property_path(&["SSESpecification", "SSEEnabled"]);
    if sse.and_then(PropertyValue::as_flag) == Some(false) {
        findings.push(Finding::new(
            resource,
            Severity::High,
            FindingKind::DYNAMODB_ENCRYPTION_DISABLED,
            "Server-side encryption is explicitly disabled (SSESpecification.SSEEnabled: false)",
            "Remove SSEEnabled: false, or set it to true with a customer managed KMS key.",
        ));
    }

    Ok(findings)
}

fn check_rds(resource: &Resource) -> RuleOutcome {
    let mut findings = Vec::new();

    // Backups and storage encryption of cluster members belong to the cluster.
    let cluster_member = resource.resource_type() == RDS_INSTANCE
        && resource.property("DBClusterIdentifier").is_some();

    if !cluster_member {
        let retention = match resource.property("BackupRetentionPeriod") {
            Some(v) if is_intrinsic(v) => None,
            Some(v) => v.as_integer(),
            None => Some(RDS_DEFAULT_RETENTION_DAYS),
        };
        if let Some(days) = retention.filter(|d| *d < MIN_RETENTION_DAYS) {
            let described = if resource.property("BackupRetentionPeriod").is_some() {
                format!("BackupRetentionPeriod is {days} days")
            } else {
                format!("BackupRetentionPeriod is not set (defaults to {days} day)")
            };
            findings.push(Finding::new(
                resource,
                Severity::Medium,
                FindingKind::RDS_BACKUP_RETENTION_INSUFFICIENT,
                format!("{described}, below {MIN_RETENTION_DAYS}"),
                "Set BackupRetentionPeriod to at least 7 days.",
            ));
        }

        let encrypted = resource.property("StorageEncrypted");
        let unencrypted = match encrypted {
            Some(v) if is_intrinsic(v) => false,
            Some(v) => v.as_flag() != Some(true),
            None => true,
        };
        if unencrypted {
            findings.push(Finding::new(
                resource,
                Severity::High,
                FindingKind::RDS_STORAGE_UNENCRYPTED,
                "Database storage is not encrypted (StorageEncrypted not true)",
                "Set StorageEncrypted to true; existing databases need a snapshot restore.",
            ));
        }
    }

    if resource
        .property("PubliclyAccessible")
        .and_then(PropertyValue::as_flag)
        == Some(true)
    {
        findings.push(Finding::new(
            resource,
            Severity::High,
            FindingKind::RDS_PUBLICLY_ACCESSIBLE,
            "Database is publicly accessible",
            "Set PubliclyAccessible to false and reach the database through private subnets.",
        ));
    }

    Ok(findings)
}
