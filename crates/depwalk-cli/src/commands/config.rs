//! `depwalk config`: defaults used when flags are omitted

use clap::{Args, Subcommand};

use crate::config::{config_file_path, Config, ConfigKey};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the value of a key
    Get {
        #[arg(value_enum)]
        key: ConfigKey,
    },
    /// Set a key; `default_fixture` must point at a loadable fixture
    Set {
        #[arg(value_enum)]
        key: ConfigKey,
        value: String,
    },
    /// Reset a key to its default
    Unset {
        #[arg(value_enum)]
        key: ConfigKey,
    },
    /// Show every key with its current value
    #[command(alias = "list")]
    Show,
    /// Print the config file location
    Path,
    /// Write a config file with default values
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(args: &ConfigArgs) -> anyhow::Result<()> {
    let path = config_file_path();
    match &args.command {
        ConfigCommands::Get { key } => {
            let config = Config::load();
            println!("{}", config.get(*key).unwrap_or_default());
        }
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load();
            config.set(*key, value)?;
            config.save()?;
            println!("Set {} in {}", key, path.display());
        }
        ConfigCommands::Unset { key } => {
            let mut config = Config::load();
            config.unset(*key);
            config.save()?;
            println!("Unset {} in {}", key, path.display());
        }
        ConfigCommands::Show => {
            let config = Config::load();
            for key in ConfigKey::ALL {
                match config.get(key) {
                    Some(value) => println!("{} = {}", key, value),
                    None => println!("{} (unset)", key),
                }
            }
        }
        ConfigCommands::Path => println!("{}", path.display()),
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Config already exists at {} (use --force to replace it)",
                    path.display()
                );
            }
            Config::default().save()?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}
