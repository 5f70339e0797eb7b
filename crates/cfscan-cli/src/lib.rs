//! # cfscan-cli: Template Security Validator CLI
//!
//! Handlers behind the `cfscan` binary. Argument structs live next to their
//! handler; `main.rs` only parses, installs logging, and dispatches.
//!
//! ## Subcommands
//!
//! - `validate`: validate template files and directories
//! - `rules`: print the rule catalog
//! - `event`: validate the objects named by an object-created notification
//!
//! ## Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | every template is below the `--fail-on` threshold |
//! | 1 | some template has a finding at or above the threshold |
//! | 2 | some template failed to parse, or the command itself failed |
//!
//! ## Crate Policy
//!
//! - Handlers delegate to `cfscan-engine`; no rule logic here.
//! - Handlers return `anyhow::Result<u8>` with context at I/O boundaries.

pub mod config;
pub mod event;
pub mod rules;
pub mod validate;
