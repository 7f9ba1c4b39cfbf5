//! Fixture inspection commands

use clap::{Args, Subcommand};
use serde::Serialize;

use crate::output::{to_json, OutputFormat};
use crate::{AppContext, Cli};
use depwalk_core::{DependencyParticipant, Direction};

#[derive(Args)]
pub struct FixtureArgs {
    #[command(subcommand)]
    pub command: FixtureCommands,
}

#[derive(Subcommand)]
pub enum FixtureCommands {
    /// Validate the fixture and summarize it
    Check,
    /// List types and their declared dependencies
    Types,
}

#[derive(Serialize)]
struct TypeSummary {
    name: String,
    records: usize,
    participant: bool,
    lower_level: Vec<String>,
    higher_level: Vec<String>,
}

pub fn run(args: &FixtureArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    tracing::debug!("Running fixture command (fixture={:?})", cli.fixture);

    match &args.command {
        FixtureCommands::Check => {
            // Loading already validated the fixture
            let types = ctx.store.types().count();
            let records = ctx.store.record_count()?;
            match ctx.format {
                OutputFormat::Json => println!(
                    "{}",
                    to_json(&serde_json::json!({"types": types, "records": records}))?
                ),
                OutputFormat::Text => println!("OK: {} types, {} records", types, records),
            }
        }
        FixtureCommands::Types => {
            let mut summaries = Vec::new();
            for schema in ctx.store.types() {
                let contract = schema.dependencies.as_ref();
                let relations = |direction: Direction| {
                    contract
                        .map(|c| c.relations(direction).to_vec())
                        .unwrap_or_default()
                };
                summaries.push(TypeSummary {
                    name: schema.name.to_string(),
                    records: ctx.store.records_of(&schema.name)?.len(),
                    participant: contract.is_some(),
                    lower_level: relations(Direction::LowerLevel),
                    higher_level: relations(Direction::HigherLevel),
                });
            }

            match ctx.format {
                OutputFormat::Json => println!("{}", to_json(&summaries)?),
                OutputFormat::Text => {
                    for summary in &summaries {
                        println!(
                            "{} ({} records){}",
                            summary.name,
                            summary.records,
                            if summary.participant { "" } else { " [no contract]" }
                        );
                        if !summary.lower_level.is_empty() {
                            println!("  lower:  {}", summary.lower_level.join(", "));
                        }
                        if !summary.higher_level.is_empty() {
                            println!("  higher: {}", summary.higher_level.join(", "));
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
