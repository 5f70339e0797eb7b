//! # cfscan-engine: Validation Engine
//!
//! Turns a parsed [`Template`](cfscan_core::Template) into a
//! [`ValidationResult`]: every resource is dispatched to the rules the
//! [`RuleRegistry`](cfscan_rules::RuleRegistry) holds for its type, and the
//! findings are assembled into a report with a status and severity counts.
//!
//! ## Modules
//!
//! - [`aggregator`]: [`Validator`], the per-resource, per-rule dispatch
//!   loop. A rule that errors or panics is contained as one
//!   `INTERNAL_RULE_ERROR` finding; the remaining rules still run.
//! - [`report`]: [`ValidationResult`], [`Status`], [`SeverityCounts`], and
//!   [`ReportBuilder`].
//! - [`invoke`]: bytes in, exactly one result out. Parse failures become a
//!   FAILED record when the caller asks for one.
//! - [`trigger`]: decode object-created notifications into the objects to
//!   validate.
//!
//! ## Crate Policy
//!
//! - No network or storage I/O. Callers fetch template bytes and persist
//!   results.
//! - [`Validator`] is `Send + Sync`; one instance serves any number of
//!   concurrent validations.

pub mod aggregator;
pub mod invoke;
pub mod report;
pub mod trigger;

pub use aggregator::Validator;
pub use invoke::{validate_document, validate_document_at, validate_or_record_failure};
pub use report::{ReportBuilder, SeverityCounts, Status, ValidationResult};
pub use trigger::{object_refs, ObjectRef, TriggerError};
