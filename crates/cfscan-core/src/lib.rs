//! # cfscan-core: Foundational Types for the Template Security Validator
//!
//! This crate is the leaf of the cfscan workspace. It turns raw template
//! text into an immutable [`Template`] and defines the value types every
//! rule and report is built from.
//!
//! ## Key Design Principles
//!
//! 1. **One dynamic value type.** Resource properties are arbitrarily nested
//!    JSON/YAML with no fixed schema. They are kept as `serde_json::Value`
//!    and read through the [`PropertyValue`] accessors, which return `None`
//!    instead of failing so that absence can be reported as a finding.
//!
//! 2. **Intrinsics are opaque.** `{"Ref": ...}` and `{"Fn::*": ...}` shapes
//!    are recognized but never evaluated.
//!
//! 3. **Closed severity, stable finding kinds.** [`Severity`] is a totally
//!    ordered enum; [`FindingKind`] is a stable identifier with a constant
//!    table for the built-in catalog.
//!
//! 4. **UTC-only timestamps.** [`Timestamp`] renders `YYYY-MM-DDTHH:MM:SSZ`.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `cfscan-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - Parsing performs no I/O: it takes bytes and returns a value.

pub mod error;
pub mod finding;
pub mod parse;
pub mod props;
pub mod template;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use error::{CfscanError, ParseError, RuleExecutionError, UnsupportedShapeError};
pub use finding::{Finding, FindingKind, Severity};
pub use parse::parse_template;
pub use props::{is_intrinsic, PropertyValue};
pub use template::{Resource, Template, TemplateFormat, TemplateId};
pub use temporal::Timestamp;
