//! # Event Subcommand
//!
//! Replays an object-created notification against a local mirror of the
//! buckets: each created object is read from `<bucket-root>/<bucket>/<key>`
//! and validated with its key as the template id. The records are printed
//! as one JSON array, the shape a result store ingests.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use cfscan_core::{Severity, TemplateFormat};
use cfscan_engine::{object_refs, validate_or_record_failure, ObjectRef};

use crate::config::CliConfig;
use crate::validate::exit_code;

/// Arguments for the event subcommand.
#[derive(Args, Debug)]
pub struct EventArgs {
    /// Notification JSON file.
    pub notification: PathBuf,

    /// Directory holding one subdirectory per bucket.
    #[arg(long)]
    pub bucket_root: PathBuf,

    /// Lowest severity that fails the run (overrides the config file).
    #[arg(long)]
    pub fail_on: Option<Severity>,
}

/// Execute the event subcommand.
pub fn run_event(args: &EventArgs, config: &CliConfig) -> Result<u8> {
    let body = std::fs::read(&args.notification)
        .with_context(|| format!("reading notification {}", args.notification.display()))?;
    let objects = object_refs(&body)
        .with_context(|| format!("decoding notification {}", args.notification.display()))?;
    if objects.is_empty() {
        tracing::info!("notification names no created objects");
    }

    let validator = config.build_validator();
    let mut results = Vec::with_capacity(objects.len());
    for object in &objects {
        let path = local_path(&args.bucket_root, object)?;
        let bytes = std::fs::read(&path).with_context(|| {
            format!("reading object {} from {}", object.display_path(), path.display())
        })?;
        let hint = TemplateFormat::from_extension(Path::new(&object.key));
        tracing::debug!(object = %object.display_path(), "validating object");
        results.push(validate_or_record_failure(&validator, &bytes, object.key.as_str(), hint));
    }

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(exit_code(&results, args.fail_on.unwrap_or(config.fail_on)))
}

/// Where `object` lives under `root`. The bucket must name exactly one
/// directory, and keys that would escape it are refused.
fn local_path(root: &Path, object: &ObjectRef) -> Result<PathBuf> {
    let key = Path::new(&object.key);
    let escapes = key
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    let mut bucket = Path::new(&object.bucket).components();
    let bucket_is_one_directory = matches!(
        (bucket.next(), bucket.next()),
        (Some(Component::Normal(_)), None)
    );
    if escapes || !bucket_is_one_directory || object.key.is_empty() {
        anyhow::bail!("refusing object {} outside the bucket root", object.display_path());
    }
    Ok(root.join(&object.bucket).join(key))
}
