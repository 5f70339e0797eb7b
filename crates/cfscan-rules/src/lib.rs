//! # cfscan-rules: Rule Registry and Built-in Rule Set
//!
//! A rule is a pure function from one [`Resource`](cfscan_core::Resource)
//! to zero or more [`Finding`](cfscan_core::Finding)s. The
//! [`RuleRegistry`] maps resource type tags to the ordered rules that apply
//! to them, so the check catalog grows by registration rather than by
//! editing a dispatcher.
//!
//! ## Built-in Rules
//!
//! | Module | Rule ids |
//! |--------|----------|
//! | [`iam`] | `iam-wildcard` |
//! | [`s3`] | `s3-public-access`, `s3-encryption`, `s3-versioning`, `s3-bucket-policy-public` |
//! | [`network`] | `sg-ingress`, `sg-egress` |
//! | [`database`] | `dynamodb-protection`, `rds-protection` |
//! | [`compute`] | `ec2-imdsv2`, `ebs-encryption` |
//! | [`serverless`] | `lambda-dead-letter`, `lambda-plaintext-secret` |
//!
//! ## Rule Policy
//!
//! - Absence of a security control is itself the finding: a property a rule
//!   depends on that is missing reads as the insecure default.
//! - Intrinsic expressions are present but unevaluable; rules never flag
//!   them by value.
//! - One invocation emits each finding kind at most once per resource; the
//!   offending items are listed in that finding's description.
//! - Malformed shapes a rule cannot interpret are returned as
//!   [`RuleExecutionError`](cfscan_core::RuleExecutionError), never panics.

pub mod compute;
pub mod database;
pub mod iam;
pub mod network;
mod policy;
pub mod registry;
pub mod s3;
pub mod serverless;

pub use registry::{CatalogEntry, Rule, RuleOutcome, RuleRegistry};

#[cfg(test)]
pub(crate) mod test_support {
    use cfscan_core::{Finding, FindingKind, Resource};
    use serde_json::Value;

    /// Build a resource from a JSON properties literal.
    pub fn resource(resource_type: &str, properties: Value) -> Resource {
        match properties {
            Value::Object(map) => Resource::new("Subject", resource_type, map),
            _ => panic!("properties must be a JSON object"),
        }
    }

    pub fn kinds(findings: &[Finding]) -> Vec<&str> {
        findings.iter().map(|f| f.finding_kind.as_str()).collect()
    }

    pub fn has_kind(findings: &[Finding], kind: &FindingKind) -> bool {
        findings.iter().any(|f| &f.finding_kind == kind)
    }
}
