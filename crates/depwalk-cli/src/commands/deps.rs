//! Dependency traversal commands

use clap::{Args, Subcommand};
use serde::Serialize;

use crate::output::{format_nodes, to_json, OutputFormat};
use crate::{AppContext, Cli};
use depwalk_core::{
    resolve_options, DependencyBuilder, DependencyNode, Direction, EntityAdapter, EntityRef,
    EntityType,
};

#[derive(Args)]
pub struct DepsArgs {
    #[command(subcommand)]
    pub command: DepsCommands,
}

#[derive(Subcommand)]
pub enum DepsCommands {
    /// Entities the given entity depends on
    Lower {
        /// Entity type
        r#type: String,
        /// Entity id
        id: String,
    },
    /// Entities that depend on the given entity
    Higher {
        /// Entity type
        r#type: String,
        /// Entity id
        id: String,
    },
    /// Longest dependency chain from the given entity
    Depth {
        /// Entity type
        r#type: String,
        /// Entity id
        id: String,
        /// Direction: lower or higher
        #[arg(short, long, default_value = "higher")]
        direction: Direction,
    },
    /// Relation paths prefetched before a traversal from a type
    Paths {
        /// Entity type
        r#type: String,
        /// Direction: lower or higher
        #[arg(short, long, default_value = "lower")]
        direction: Direction,
    },
    /// Selectable options of a type
    Options {
        /// Entity type
        r#type: String,
    },
}

/// JSON form of a traversal
#[derive(Serialize)]
struct Traversal<'a> {
    root: EntityRef,
    direction: Direction,
    depth: usize,
    dependencies: &'a [DependencyNode],
}

pub fn run(args: &DepsArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    tracing::debug!(
        "Running deps command (recursive={}, eager={}, filter_actions={})",
        !cli.no_recursion,
        !cli.no_eager,
        !cli.no_filter_actions
    );

    let mut builder = DependencyBuilder::with_options(&ctx.store, ctx.options.clone());

    match &args.command {
        DepsCommands::Lower { r#type, id } => {
            traverse(&mut builder, ctx, find_root(ctx, r#type, id)?, Direction::LowerLevel)?;
        }
        DepsCommands::Higher { r#type, id } => {
            traverse(&mut builder, ctx, find_root(ctx, r#type, id)?, Direction::HigherLevel)?;
        }
        DepsCommands::Depth {
            r#type,
            id,
            direction,
        } => {
            let root = find_root(ctx, r#type, id)?;
            let depth = builder.dependencies_depth(&root, *direction)?;
            match ctx.format {
                OutputFormat::Json => println!(
                    "{}",
                    to_json(&serde_json::json!({
                        "root": root,
                        "direction": direction,
                        "depth": depth,
                    }))?
                ),
                OutputFormat::Text => println!("{}", depth),
            }
        }
        DepsCommands::Paths { r#type, direction } => {
            let entity_type = known_type(ctx, r#type)?;
            let paths = builder.relation_paths(&entity_type, *direction)?;
            match ctx.format {
                OutputFormat::Json => println!("{}", to_json(&paths)?),
                OutputFormat::Text => {
                    for path in &paths {
                        println!("{}", path);
                    }
                }
            }
        }
        DepsCommands::Options { r#type } => {
            let entity_type = known_type(ctx, r#type)?;
            let options = resolve_options(&ctx.store, &entity_type)?;
            match (ctx.format, options) {
                (OutputFormat::Json, options) => println!("{}", to_json(&options)?),
                (OutputFormat::Text, None) => {
                    println!("{} has no option field", entity_type);
                }
                (OutputFormat::Text, Some(options)) => {
                    for option in options {
                        println!("{}\t{}", option.id, option.name);
                    }
                }
            }
        }
    }

    Ok(())
}

fn traverse<A: EntityAdapter + ?Sized>(
    builder: &mut DependencyBuilder<'_, A>,
    ctx: &AppContext,
    root: EntityRef,
    direction: Direction,
) -> anyhow::Result<()> {
    let nodes = builder.dependencies(&root, direction)?;
    tracing::info!("{} {} dependencies of {}", nodes.len(), direction, root);

    let output = match ctx.format {
        OutputFormat::Json => to_json(&Traversal {
            depth: depwalk_core::max_depth(nodes),
            root,
            direction,
            dependencies: nodes,
        })?,
        OutputFormat::Text => format_nodes(nodes, OutputFormat::Text)?,
    };
    print!("{}", output);
    if ctx.format == OutputFormat::Json {
        println!();
    }
    Ok(())
}

fn known_type(ctx: &AppContext, name: &str) -> anyhow::Result<EntityType> {
    let entity_type = EntityType::new(name);
    if ctx.store.schema(&entity_type).is_none() {
        anyhow::bail!("Unknown entity type: {}", name);
    }
    Ok(entity_type)
}

fn find_root(ctx: &AppContext, type_name: &str, id: &str) -> anyhow::Result<EntityRef> {
    let root = EntityRef::new(known_type(ctx, type_name)?, id);
    if !ctx.store.contains(&root)? {
        anyhow::bail!("Entity not found: {}", root);
    }
    Ok(root)
}
