//! # Findings: Severity, Finding Kinds, and the Finding Value
//!
//! A [`Finding`] is one reported security/compliance issue tied to one
//! resource. Findings are immutable values created only by rules during a
//! validation pass.
//!
//! [`FindingKind`] is a stable identifier (`IAM_WILDCARD_ACTION`, ...) that
//! test assertions and downstream consumers match on instead of prose. The
//! built-in catalog is the constant table on `FindingKind`; extension rules
//! can mint their own kinds with [`FindingKind::custom`].

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::template::Resource;

/// Severity of a finding, totally ordered `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Hygiene issue; does not affect status beyond WARNING.
    Low,
    /// Missing hardening or an informational exposure.
    Medium,
    /// Exploitable misconfiguration. Fails the template.
    High,
    /// Direct compromise risk. Fails the template.
    Critical,
}

impl Severity {
    /// All severities from most to least severe, the order reports use.
    pub fn descending() -> [Severity; 4] {
        [Self::Critical, Self::High, Self::Medium, Self::Low]
    }

    /// Upper-case identifier matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    /// Whether a finding of this severity fails the template.
    pub fn is_failing(&self) -> bool {
        *self >= Self::High
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "CRITICAL" => Ok(Self::Critical),
            _ => Err(format!(
                "unknown severity: {s:?} (expected one of low, medium, high, critical)"
            )),
        }
    }
}

/// Stable identifier of what a finding is about.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FindingKind(Cow<'static, str>);

impl FindingKind {
    pub const IAM_WILDCARD_ACTION: Self = Self::builtin("IAM_WILDCARD_ACTION");
    pub const IAM_WILDCARD_RESOURCE: Self = Self::builtin("IAM_WILDCARD_RESOURCE");
    pub const S3_PUBLIC_ACCESS_NOT_BLOCKED: Self = Self::builtin("S3_PUBLIC_ACCESS_NOT_BLOCKED");
    pub const S3_PUBLIC_ACL: Self = Self::builtin("S3_PUBLIC_ACL");
    pub const S3_ENCRYPTION_MISSING: Self = Self::builtin("S3_ENCRYPTION_MISSING");
    pub const S3_VERSIONING_DISABLED: Self = Self::builtin("S3_VERSIONING_DISABLED");
    pub const S3_BUCKET_POLICY_PUBLIC: Self = Self::builtin("S3_BUCKET_POLICY_PUBLIC");
    pub const SG_UNRESTRICTED_SSH: Self = Self::builtin("SG_UNRESTRICTED_SSH");
    pub const SG_UNRESTRICTED_RDP: Self = Self::builtin("SG_UNRESTRICTED_RDP");
    pub const SG_UNRESTRICTED_ALL_PORTS: Self = Self::builtin("SG_UNRESTRICTED_ALL_PORTS");
    pub const SG_UNRESTRICTED_EGRESS: Self = Self::builtin("SG_UNRESTRICTED_EGRESS");
    pub const DYNAMODB_PITR_DISABLED: Self = Self::builtin("DYNAMODB_PITR_DISABLED");
    pub const DYNAMODB_PITR_PERIOD_SHORT: Self = Self::builtin("DYNAMODB_PITR_PERIOD_SHORT");
    pub const DYNAMODB_ENCRYPTION_DISABLED: Self = Self::builtin("DYNAMODB_ENCRYPTION_DISABLED");
    pub const RDS_BACKUP_RETENTION_INSUFFICIENT: Self =
        Self::builtin("RDS_BACKUP_RETENTION_INSUFFICIENT");
    pub const RDS_STORAGE_UNENCRYPTED: Self = Self::builtin("RDS_STORAGE_UNENCRYPTED");
    pub const RDS_PUBLICLY_ACCESSIBLE: Self = Self::builtin("RDS_PUBLICLY_ACCESSIBLE");
    pub const EC2_IMDSV2_NOT_ENFORCED: Self = Self::builtin("EC2_IMDSV2_NOT_ENFORCED");
    pub const EBS_VOLUME_UNENCRYPTED: Self = Self::builtin("EBS_VOLUME_UNENCRYPTED");
    pub const LAMBDA_DLQ_MISSING: Self = Self::builtin("LAMBDA_DLQ_MISSING");
    pub const LAMBDA_HARDCODED_SECRET: Self = Self::builtin("LAMBDA_HARDCODED_SECRET");
    /// Emitted by the aggregator when a rule fails instead of inspecting.
    pub const INTERNAL_RULE_ERROR: Self = Self::builtin("INTERNAL_RULE_ERROR");
    /// Emitted on the failure record of a template that did not parse.
    pub const PARSE_ERROR: Self = Self::builtin("PARSE_ERROR");

    /// Every kind the built-in rules and the engine can emit.
    pub const CATALOG: &'static [FindingKind] = &[
        Self::IAM_WILDCARD_ACTION,
        Self::IAM_WILDCARD_RESOURCE,
        Self::S3_PUBLIC_ACCESS_NOT_BLOCKED,
        Self::S3_PUBLIC_ACL,
        Self::S3_ENCRYPTION_MISSING,
        Self::S3_VERSIONING_DISABLED,
        Self::S3_BUCKET_POLICY_PUBLIC,
        Self::SG_UNRESTRICTED_SSH,
        Self::SG_UNRESTRICTED_RDP,
        Self::SG_UNRESTRICTED_ALL_PORTS,
        Self::SG_UNRESTRICTED_EGRESS,
        Self::DYNAMODB_PITR_DISABLED,
        Self::DYNAMODB_PITR_PERIOD_SHORT,
        Self::DYNAMODB_ENCRYPTION_DISABLED,
        Self::RDS_BACKUP_RETENTION_INSUFFICIENT,
        Self::RDS_STORAGE_UNENCRYPTED,
        Self::RDS_PUBLICLY_ACCESSIBLE,
        Self::EC2_IMDSV2_NOT_ENFORCED,
        Self::EBS_VOLUME_UNENCRYPTED,
        Self::LAMBDA_DLQ_MISSING,
        Self::LAMBDA_HARDCODED_SECRET,
        Self::INTERNAL_RULE_ERROR,
        Self::PARSE_ERROR,
    ];

    const fn builtin(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }

    /// A kind outside the built-in catalog, for extension rules.
    pub fn custom(id: impl Into<String>) -> Self {
        Self(Cow::Owned(id.into()))
    }

    /// The identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One reported issue on one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// Logical name of the offending resource.
    pub resource_name: String,
    /// Type tag of the offending resource.
    pub resource_type: String,
    pub severity: Severity,
    pub finding_kind: FindingKind,
    /// Human-readable description of what was found.
    pub description: String,
    /// How to fix it.
    pub recommendation: String,
}

impl Finding {
    /// Create a finding about `resource`.
    pub fn new(
        resource: &Resource,
        severity: Severity,
        finding_kind: FindingKind,
        description: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            resource_name: resource.name().to_string(),
            resource_type: resource.resource_type().to_string(),
            severity,
            finding_kind,
            description: description.into(),
            recommendation: recommendation.into(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} ({}): {}",
            self.severity,
            self.finding_kind,
            self.resource_name,
            self.resource_type,
            self.description
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn severity_total_order() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
        assert_eq!(
            Severity::descending().iter().max(),
            Some(&Severity::Critical)
        );
    }

    #[test]
    fn severity_failing_threshold() {
        assert!(Severity::Critical.is_failing());
        assert!(Severity::High.is_failing());
        assert!(!Severity::Medium.is_failing());
        assert!(!Severity::Low.is_failing());
    }

    #[test]
    fn severity_serde_is_uppercase() {
        assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"CRITICAL\"");
        let parsed: Severity = serde_json::from_str("\"MEDIUM\"").unwrap();
        assert_eq!(parsed, Severity::Medium);
    }

    #[test]
    fn severity_from_str_is_case_insensitive() {
        assert_eq!("high".parse::<Severity>().unwrap(), Severity::High);
        assert_eq!("Critical".parse::<Severity>().unwrap(), Severity::Critical);
        assert!("severe".parse::<Severity>().is_err());
    }

    #[test]
    fn finding_kind_catalog_is_unique() {
        let ids: HashSet<&str> = FindingKind::CATALOG.iter().map(|k| k.as_str()).collect();
        assert_eq!(ids.len(), FindingKind::CATALOG.len());
    }

    #[test]
    fn custom_kind_equals_builtin_with_same_id() {
        assert_eq!(
            FindingKind::custom("IAM_WILDCARD_ACTION"),
            FindingKind::IAM_WILDCARD_ACTION
        );
    }

    #[test]
    fn finding_serializes_camel_case() {
        let resource = Resource::new("AppRole", "AWS::IAM::Role", serde_json::Map::new());
        let finding = Finding::new(
            &resource,
            Severity::Critical,
            FindingKind::IAM_WILDCARD_ACTION,
            "Action \"*\"",
            "Scope the action list",
        );
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["resourceName"], "AppRole");
        assert_eq!(json["resourceType"], "AWS::IAM::Role");
        assert_eq!(json["severity"], "CRITICAL");
        assert_eq!(json["findingKind"], "IAM_WILDCARD_ACTION");
        assert_eq!(json["recommendation"], "Scope the action list");
    }
}
