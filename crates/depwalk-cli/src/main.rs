//! Depwalk CLI - explore entity dependency trees from a fixture file

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::{completions, config as config_cmd, deps, fixture};
use config::Config;
use depwalk_core::limits::validate_scope_override;
use depwalk_core::TraversalOptions;
use depwalk_storage::{Fixture, MemoryStore};
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "depwalk")]
#[command(author, version, about = "Dependency trees for related entities")]
pub struct Cli {
    /// Fixture file with types and records (JSON or TOML)
    #[arg(short = 'x', long, global = true, env = "DEPWALK_FIXTURE")]
    pub fixture: Option<PathBuf>,

    /// Output format: text, json
    #[arg(short, long, global = true)]
    pub format: Option<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Only report direct dependencies
    #[arg(long, global = true)]
    pub no_recursion: bool,

    /// Skip prefetching relation paths
    #[arg(long, global = true)]
    pub no_eager: bool,

    /// Report declared actions without narrowing them
    #[arg(long, global = true)]
    pub no_filter_actions: bool,

    /// Load a lower-level relation path through a named scope (path=scope)
    #[arg(long = "scope", value_name = "PATH=SCOPE", global = true)]
    pub scopes: Vec<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Traversal options from the command-line flags
    pub fn traversal_options(&self) -> anyhow::Result<TraversalOptions> {
        let mut options = TraversalOptions::new();
        if self.no_recursion {
            options = options.without_recursion();
        }
        if self.no_eager {
            options = options.without_eager_loading();
        }
        if self.no_filter_actions {
            options = options.without_action_filter();
        }

        for pair in &self.scopes {
            let (path, scope) = pair
                .split_once('=')
                .with_context(|| format!("Invalid scope override '{}', expected PATH=SCOPE", pair))?;
            let (path, scope) = (path.trim(), scope.trim());
            validate_scope_override(path, scope)?;
            options = options.with_scope_override(path, scope);
        }

        Ok(options)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Traverse dependencies of an entity
    Deps(deps::DepsArgs),
    /// Inspect the fixture file
    Fixture(fixture::FixtureArgs),
    /// Manage CLI configuration
    Config(config_cmd::ConfigArgs),
    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Application context with the loaded store
pub struct AppContext {
    pub store: MemoryStore,
    pub format: OutputFormat,
    pub options: TraversalOptions,
}

impl AppContext {
    pub fn new(cli: &Cli, config: &Config) -> anyhow::Result<Self> {
        let path = cli
            .fixture
            .clone()
            .or_else(|| config.default_fixture.clone())
            .context("No fixture given. Pass --fixture or set default_fixture in the config")?;

        tracing::debug!("Using fixture at: {:?}", path);
        let store = Fixture::load(&path)
            .and_then(Fixture::into_store)
            .with_context(|| format!("Failed to load fixture {}", path.display()))?;

        let format = cli
            .format
            .as_deref()
            .unwrap_or(config.format.as_str())
            .parse()?;

        Ok(Self {
            store,
            format,
            options: cli.traversal_options()?,
        })
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    tracing::debug!("Starting depwalk CLI");

    match &cli.command {
        Commands::Config(args) => config_cmd::run(args),
        Commands::Completions(args) => completions::run(args),
        Commands::Deps(args) => {
            let ctx = AppContext::new(&cli, &Config::load())?;
            deps::run(args, &cli, &ctx)
        }
        Commands::Fixture(args) => {
            let ctx = AppContext::new(&cli, &Config::load())?;
            fixture::run(args, &cli, &ctx)
        }
    }
}
