//! CLI configuration

use std::path::PathBuf;

use anyhow::Context;
use clap::ValueEnum;
use depwalk_storage::Fixture;
use serde::{Deserialize, Serialize};

use crate::output::OutputFormat;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "DEPWALK_CONFIG";

/// Get the config file path
pub fn config_file_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("depwalk")
        .join("config.toml")
}

fn default_format() -> String {
    "text".to_string()
}

/// Configuration for the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Fixture used when `--fixture` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_fixture: Option<PathBuf>,

    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_fixture: None,
            format: default_format(),
        }
    }
}

/// Keys accepted by `depwalk config`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigKey {
    #[value(name = "default_fixture")]
    DefaultFixture,
    Format,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 2] = [ConfigKey::DefaultFixture, ConfigKey::Format];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DefaultFixture => "default_fixture",
            Self::Format => "format",
        }
    }
}

impl std::fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Config {
    /// Load the config file, falling back to defaults when it is missing
    /// or unreadable
    pub fn load() -> Self {
        let path = config_file_path();
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path = config_file_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, toml::to_string_pretty(self)?)?;
        tracing::debug!("Saved config to {:?}", path);
        Ok(())
    }

    /// Current value, `None` when unset
    pub fn get(&self, key: ConfigKey) -> Option<String> {
        match key {
            ConfigKey::DefaultFixture => self
                .default_fixture
                .as_ref()
                .map(|p| p.display().to_string()),
            ConfigKey::Format => Some(self.format.clone()),
        }
    }

    /// Set a key, rejecting values the CLI could not use later
    ///
    /// A default fixture must exist and load into a valid store.
    pub fn set(&mut self, key: ConfigKey, value: &str) -> anyhow::Result<()> {
        match key {
            ConfigKey::DefaultFixture => {
                let path = PathBuf::from(value);
                if !path.is_file() {
                    anyhow::bail!("Fixture not found: {}", path.display());
                }
                Fixture::load(&path)
                    .and_then(Fixture::into_store)
                    .with_context(|| format!("Invalid fixture {}", path.display()))?;
                self.default_fixture = Some(path);
            }
            ConfigKey::Format => {
                let format: OutputFormat = value.parse()?;
                self.format = format.as_str().to_string();
            }
        }
        Ok(())
    }

    /// Reset a key to its default
    pub fn unset(&mut self, key: ConfigKey) {
        match key {
            ConfigKey::DefaultFixture => self.default_fixture = None,
            ConfigKey::Format => self.format = default_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
[[types]]
name = "Customer"
"#;

    #[test]
    fn test_get_and_set() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = dir.path().join("shop.toml");
        std::fs::write(&fixture, FIXTURE).unwrap();

        let mut config = Config::default();
        assert_eq!(config.get(ConfigKey::Format), Some("text".to_string()));
        assert_eq!(config.get(ConfigKey::DefaultFixture), None);

        config
            .set(ConfigKey::DefaultFixture, fixture.to_str().unwrap())
            .unwrap();
        config.set(ConfigKey::Format, "JSON").unwrap();
        assert_eq!(config.default_fixture, Some(fixture));
        assert_eq!(config.get(ConfigKey::Format), Some("json".to_string()));

        config.unset(ConfigKey::DefaultFixture);
        config.unset(ConfigKey::Format);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        let missing = dir.path().join("missing.toml");

        let mut config = Config::default();
        assert!(config.set(ConfigKey::Format, "yaml").is_err());
        assert!(config
            .set(ConfigKey::DefaultFixture, missing.to_str().unwrap())
            .is_err());
        assert!(config
            .set(ConfigKey::DefaultFixture, broken.to_str().unwrap())
            .is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_key_names() {
        let names: Vec<&str> = ConfigKey::ALL.iter().map(ConfigKey::as_str).collect();
        assert_eq!(names, ["default_fixture", "format"]);
        assert_eq!(
            ConfigKey::from_str("default_fixture", false),
            Ok(ConfigKey::DefaultFixture)
        );
        assert!(ConfigKey::from_str("color", false).is_err());
    }

    #[test]
    fn test_toml_round_trip_with_defaults() {
        let config: Config = toml::from_str("default_fixture = \"a.json\"").unwrap();
        assert_eq!(config.format, "text");

        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(toml::from_str::<Config>(&text).unwrap(), config);
    }
}
