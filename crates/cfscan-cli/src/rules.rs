//! # Rules Subcommand
//!
//! Prints the rule catalog after configuration has been applied, so a
//! disabled rule is visibly absent.

use anyhow::Result;
use clap::Args;
use cfscan_rules::CatalogEntry;
use serde::Serialize;

use crate::config::{CliConfig, OutputFormat};

/// Arguments for the rules subcommand.
#[derive(Args, Debug)]
pub struct RulesArgs {
    /// Output format (overrides the config file).
    #[arg(long, value_enum)]
    pub output: Option<OutputFormat>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogRow<'a> {
    resource_type: &'a str,
    rule_id: &'a str,
    summary: &'a str,
}

/// Execute the rules subcommand.
pub fn run_rules(args: &RulesArgs, config: &CliConfig) -> Result<u8> {
    let validator = config.build_validator();
    let catalog = validator.registry().catalog();
    match args.output.unwrap_or(config.output) {
        OutputFormat::Json => {
            let rows: Vec<CatalogRow<'_>> = catalog
                .iter()
                .map(|e| CatalogRow {
                    resource_type: &e.resource_type,
                    rule_id: e.rule_id,
                    summary: e.summary,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Text => print!("{}", render_catalog(&catalog)),
    }
    Ok(0)
}

fn render_catalog(catalog: &[CatalogEntry]) -> String {
    let type_width = catalog
        .iter()
        .map(|e| e.resource_type.len())
        .max()
        .unwrap_or(0);
    let id_width = catalog.iter().map(|e| e.rule_id.len()).max().unwrap_or(0);
    let mut out = String::new();
    for entry in catalog {
        out.push_str(&format!(
            "  {:<type_width$}  {:<id_width$}  {}\n",
            entry.resource_type, entry.rule_id, entry.summary
        ));
    }
    out.push_str(&format!("\nTotal: {} registrations\n", catalog.len()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfscan_rules::RuleRegistry;

    #[test]
    fn catalog_lines_are_aligned() {
        let catalog = RuleRegistry::with_builtin_rules().catalog();
        let text = render_catalog(&catalog);
        let columns: Vec<usize> = catalog
            .iter()
            .zip(text.lines())
            .map(|(entry, line)| line.find(entry.rule_id).unwrap())
            .collect();
        assert!(columns.windows(2).all(|w| w[0] == w[1]));
        assert!(text.contains("AWS::S3::Bucket"));
        assert!(text.ends_with(&format!("Total: {} registrations\n", catalog.len())));
    }

    #[test]
    fn rules_command_succeeds() {
        let args = RulesArgs {
            output: Some(OutputFormat::Json),
        };
        assert_eq!(run_rules(&args, &CliConfig::default()).unwrap(), 0);
    }
}
