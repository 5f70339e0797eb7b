//! # Error Types: Structured Error Hierarchy
//!
//! All errors use `thiserror` for derive-based `Display` and `Error`
//! implementations.
//!
//! ## Propagation
//!
//! - [`ParseError`] is fatal to one invocation and is reported to the caller
//!   as a value, never retried.
//! - [`RuleExecutionError`] is internal to one rule. The aggregator contains
//!   it and turns it into a finding; it never escapes a validation pass.
//! - [`CfscanError`] is the umbrella type for callers that mix parsing with
//!   configuration and file I/O.

use thiserror::Error;

use crate::template::TemplateFormat;

/// Top-level error type for cfscan callers.
#[derive(Error, Debug)]
pub enum CfscanError {
    /// The template document could not be turned into a `Template`.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Configuration could not be loaded or is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization of a result record failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error turning raw template text into a [`Template`](crate::Template).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The text is not well-formed JSON or YAML.
    #[error("malformed {format} document: {reason}")]
    Malformed {
        /// Format the text was parsed as.
        format: TemplateFormat,
        /// Underlying parser message.
        reason: String,
    },

    /// The document is well-formed but not shaped like a template.
    #[error(transparent)]
    UnsupportedShape(#[from] UnsupportedShapeError),

    /// A YAML tag was found. Short-hand intrinsics such as `!Ref` or `!Sub`
    /// cannot be mapped onto the `Ref`/`Fn::*` convention.
    #[error(
        "unsupported YAML tag '{tag}' at {path}; use the long-form 'Ref'/'Fn::*' mapping instead"
    )]
    UnsupportedTag {
        /// The tag as written, including the leading `!`.
        tag: String,
        /// Dotted path to the tagged node.
        path: String,
    },

    /// A resource entry is missing its `Type` or has malformed `Properties`.
    #[error("invalid resource '{name}': {reason}")]
    InvalidResource {
        /// Logical name of the resource.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// A node of the document does not have the shape a template requires.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported document shape at {location}: expected {expected}, found {found}")]
pub struct UnsupportedShapeError {
    /// Where in the document the mismatch is (`(root)`, `Resources`).
    pub location: String,
    /// The shape that was required.
    pub expected: String,
    /// The shape that was found.
    pub found: String,
}

/// A rule could not complete its inspection of a resource.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("rule '{rule_id}' failed: {reason}")]
pub struct RuleExecutionError {
    /// Identifier of the failing rule.
    pub rule_id: String,
    /// Why it failed.
    pub reason: String,
}

impl RuleExecutionError {
    /// Convenience constructor.
    pub fn new(rule_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            reason: reason.into(),
        }
    }
}
