//! # Validation Reports
//!
//! A [`ValidationResult`] is the record one validation pass produces: the
//! template it is about, when it was produced, an overall [`Status`], the
//! ordered findings, and per-severity counts.
//!
//! ## Status
//!
//! | Findings | Status |
//! |----------|--------|
//! | any CRITICAL or HIGH | `FAILED` |
//! | only MEDIUM / LOW | `WARNING` |
//! | none | `PASSED` |
//!
//! Serialized field names are camelCase and severity-count keys are the
//! upper-case severity names, which is the shape downstream stores index.

use std::fmt;

use cfscan_core::{Finding, FindingKind, ParseError, Severity, TemplateId, Timestamp};
use serde::{Deserialize, Serialize};

const PARSE_FAILURE_FIX: &str = "Fix the document so it parses as a CloudFormation template; \
    YAML short-form tags such as !Ref must be written in long form (Ref:, Fn::Sub:).";

/// Overall outcome of one validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Passed,
    Failed,
    Warning,
}

impl Status {
    /// The status implied by a set of severity counts.
    pub fn from_counts(counts: &SeverityCounts) -> Self {
        if counts.critical > 0 || counts.high > 0 {
            Self::Failed
        } else if counts.medium > 0 || counts.low > 0 {
            Self::Warning
        } else {
            Self::Passed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::Warning => "WARNING",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of findings at each severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    #[serde(rename = "CRITICAL")]
    pub critical: usize,
    #[serde(rename = "HIGH")]
    pub high: usize,
    #[serde(rename = "MEDIUM")]
    pub medium: usize,
    #[serde(rename = "LOW")]
    pub low: usize,
}

impl SeverityCounts {
    pub fn tally<'a>(findings: impl IntoIterator<Item = &'a Finding>) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            *counts.slot(finding.severity) += 1;
        }
        counts
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }

    fn slot(&mut self, severity: Severity) -> &mut usize {
        match severity {
            Severity::Critical => &mut self.critical,
            Severity::High => &mut self.high,
            Severity::Medium => &mut self.medium,
            Severity::Low => &mut self.low,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }
}

impl fmt::Display for SeverityCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} CRITICAL, {} HIGH, {} MEDIUM, {} LOW",
            self.critical, self.high, self.medium, self.low
        )
    }
}

/// The record produced by one validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub template_id: TemplateId,
    pub timestamp: Timestamp,
    pub status: Status,
    /// In (resource order, rule order, emission order).
    pub findings: Vec<Finding>,
    pub severity_counts: SeverityCounts,
}

impl ValidationResult {
    /// The distinct FAILED record for a template that could not be parsed.
    pub fn parse_failure(
        template_id: impl Into<TemplateId>,
        error: &ParseError,
        timestamp: Timestamp,
    ) -> Self {
        let finding = Finding {
            resource_name: "(template)".to_string(),
            resource_type: "Template".to_string(),
            severity: Severity::Critical,
            finding_kind: FindingKind::PARSE_ERROR,
            description: error.to_string(),
            recommendation: PARSE_FAILURE_FIX.to_string(),
        };
        ReportBuilder::new(template_id)
            .timestamp(timestamp)
            .findings(vec![finding])
            .build()
    }

    /// `(templateId, timestamp)`, the key a result store indexes on.
    pub fn record_key(&self) -> (&TemplateId, &Timestamp) {
        (&self.template_id, &self.timestamp)
    }

    /// Highest severity among the findings, if any.
    pub fn max_severity(&self) -> Option<Severity> {
        self.findings.iter().map(|f| f.severity).max()
    }

    /// Whether any finding is at or above `threshold`.
    pub fn has_finding_at_or_above(&self, threshold: Severity) -> bool {
        self.max_severity().is_some_and(|s| s >= threshold)
    }

    /// Findings of one kind, in report order.
    pub fn findings_of(&self, kind: &FindingKind) -> impl Iterator<Item = &Finding> + '_ {
        let kind = kind.clone();
        self.findings.iter().filter(move |f| f.finding_kind == kind)
    }

    /// Whether this is the record of a template that failed to parse.
    pub fn is_parse_failure(&self) -> bool {
        self.findings
            .iter()
            .any(|f| f.finding_kind == FindingKind::PARSE_ERROR)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Assembles a [`ValidationResult`], deriving counts and status from the
/// findings.
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    template_id: TemplateId,
    timestamp: Option<Timestamp>,
    findings: Vec<Finding>,
}

impl ReportBuilder {
    pub fn new(template_id: impl Into<TemplateId>) -> Self {
        Self {
            template_id: template_id.into(),
            timestamp: None,
            findings: Vec::new(),
        }
    }

    /// Processing time; defaults to now when not set.
    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Replace the findings.
    pub fn findings(mut self, findings: Vec<Finding>) -> Self {
        self.findings = findings;
        self
    }

    /// Append one finding.
    pub fn finding(mut self, finding: Finding) -> Self {
        self.findings.push(finding);
        self
    }

    pub fn build(self) -> ValidationResult {
        let severity_counts = SeverityCounts::tally(&self.findings);
        ValidationResult {
            template_id: self.template_id,
            timestamp: self.timestamp.unwrap_or_else(Timestamp::now),
            status: Status::from_counts(&severity_counts),
            findings: self.findings,
            severity_counts,
        }
    }
}
