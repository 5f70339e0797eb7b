//! # Validate Subcommand
//!
//! Validates template files, or every template under a directory
//! (`.json`, `.yaml`, `.yml`, `.template`), and prints one report per
//! template.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use cfscan_core::{Severity, TemplateFormat, Timestamp};
use cfscan_engine::{validate_document_at, ValidationResult, Validator};

use crate::config::{CliConfig, OutputFormat};

/// Extensions picked up when walking a directory.
const TEMPLATE_EXTENSIONS: &[&str] = &["json", "yaml", "yml", "template"];

/// Exit code: every template is below the threshold.
pub const EXIT_OK: u8 = 0;
/// Exit code: some template has a finding at or above the threshold.
pub const EXIT_FINDINGS: u8 = 1;
/// Exit code: some template could not be parsed.
pub const EXIT_PARSE_FAILURE: u8 = 2;
/// Exit code: the command itself failed (unreadable path, bad config).
pub const EXIT_ERROR: u8 = 2;

/// Template encoding forced from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Json,
    Yaml,
}

impl From<FormatArg> for TemplateFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => TemplateFormat::Json,
            FormatArg::Yaml => TemplateFormat::Yaml,
        }
    }
}

/// Arguments for the validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Template files or directories to scan.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Parse every template as this format instead of detecting it.
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Output format (overrides the config file).
    #[arg(long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Lowest severity that fails the run (overrides the config file).
    #[arg(long)]
    pub fail_on: Option<Severity>,
}

/// Execute the validate subcommand.
pub fn run_validate(args: &ValidateArgs, config: &CliConfig) -> Result<u8> {
    let validator = config.build_validator();
    let files = collect_templates(&args.paths)?;
    if files.is_empty() {
        anyhow::bail!("no templates found under the given paths");
    }
    tracing::info!(templates = files.len(), "validating templates");

    let mut results = Vec::with_capacity(files.len());
    for path in &files {
        results.push(validate_file(&validator, path, args.format.map(Into::into))?);
    }

    let output = args.output.unwrap_or(config.output);
    let fail_on = args.fail_on.unwrap_or(config.fail_on);
    print_results(&results, output)?;
    Ok(exit_code(&results, fail_on))
}

/// Validate one file; a parse failure becomes the FAILED record.
pub fn validate_file(
    validator: &Validator,
    path: &Path,
    forced: Option<TemplateFormat>,
) -> Result<ValidationResult> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let template_id = path.display().to_string();
    let hint = forced.or_else(|| TemplateFormat::from_extension(path));
    let timestamp = Timestamp::now();
    Ok(
        match validate_document_at(validator, &bytes, template_id.as_str(), hint, timestamp) {
            Ok(result) => result,
            Err(error) => {
                tracing::warn!(path = %path.display(), error = %error, "template failed to parse");
                ValidationResult::parse_failure(template_id, &error, timestamp)
            }
        },
    )
}

/// Expand directories into the template files beneath them, sorted.
/// Paths named explicitly are kept whatever their extension.
pub fn collect_templates(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        let metadata =
            std::fs::metadata(path).with_context(|| format!("cannot access {}", path.display()))?;
        if metadata.is_dir() {
            let mut found = Vec::new();
            walk(path, &mut found)?;
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

fn walk(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("reading directory {}", dir.display()))?;
    for entry in entries {
        let path = entry
            .with_context(|| format!("reading directory {}", dir.display()))?
            .path();
        if path.is_dir() {
            walk(&path, found)?;
        } else if has_template_extension(&path) {
            found.push(path);
        }
    }
    Ok(())
}

fn has_template_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            TEMPLATE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// `2` if any template failed to parse, else `1` if any has a finding at or
/// above `fail_on`, else `0`.
pub fn exit_code(results: &[ValidationResult], fail_on: Severity) -> u8 {
    if results.iter().any(ValidationResult::is_parse_failure) {
        EXIT_PARSE_FAILURE
    } else if results.iter().any(|r| r.has_finding_at_or_above(fail_on)) {
        EXIT_FINDINGS
    } else {
        EXIT_OK
    }
}

pub(crate) fn print_results(results: &[ValidationResult], output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(results)?);
        }
        OutputFormat::Text => {
            for result in results {
                print!("{}", render_text(result));
            }
            if results.len() > 1 {
                let failed = results
                    .iter()
                    .filter(|r| r.status == cfscan_engine::Status::Failed)
                    .count();
                println!("{} templates, {failed} failed", results.len());
            }
        }
    }
    Ok(())
}

/// Human-readable report for one template.
pub fn render_text(result: &ValidationResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}: {} ({})",
        result.template_id, result.status, result.severity_counts
    );
    for finding in &result.findings {
        let _ = writeln!(out, "  {finding}");
        let _ = writeln!(out, "      fix: {}", finding.recommendation);
    }
    out
}
