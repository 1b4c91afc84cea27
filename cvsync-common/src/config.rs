//! Configuration loading and data directory resolution
//!
//! Settings come from, in priority order:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default
//!
//! Secrets (the webhook auth token, the Mailgun API key) are only ever read
//! from the environment and never from the TOML file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{Error, Result};

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "CVSYNC_DATA_DIR";

/// Port used when neither CLI, environment nor TOML set one
pub const DEFAULT_PORT: u16 = 5790;

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    pub data_dir: Option<PathBuf>,
    pub port: Option<u16>,
    pub bind_address: Option<String>,
    /// Where generated pages go; page generation is off when unset
    pub pages_dir: Option<PathBuf>,
    pub base_url: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub mailgun: MailgunConfig,
}

/// `[logging]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins when set
    pub level: Option<String>,
}

/// `[mailgun]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailgunConfig {
    pub domain: String,
    pub from: String,
    pub to: String,
}

impl Default for MailgunConfig {
    fn default() -> Self {
        Self {
            domain: "mg.sfago2024.org".to_string(),
            from: "sfago2024 Notifications <notifications@mg.sfago2024.org>".to_string(),
            to: "Colin Chan <colin@sfago2024.org>".to_string(),
        }
    }
}

/// Platform config file location (`~/.config/cvsync/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cvsync").join("config.toml"))
}

/// Load the TOML config
///
/// An explicitly requested file must exist and parse. The default location is
/// optional: if it is missing the compiled defaults are used.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => {
                info!("No config file found, using defaults");
                return Ok(TomlConfig::default());
            }
        },
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Resolve the data directory: CLI > environment > TOML > compiled default
pub fn resolve_data_dir(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
        warn!("{} is set but empty, ignoring", env_var_name);
    }

    if let Some(path) = &toml_config.data_dir {
        return path.clone();
    }

    default_data_dir()
}

/// OS-dependent default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("cvsync"))
        .unwrap_or_else(|| PathBuf::from("./cvsync_data"))
}

/// Resolve the listen port: CLI/environment value > TOML > compiled default
pub fn resolve_port(cli_or_env: Option<u16>, toml_config: &TomlConfig) -> u16 {
    cli_or_env.or(toml_config.port).unwrap_or(DEFAULT_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_toml() {
        let config: TomlConfig = toml::from_str(
            r#"
            data_dir = "/srv/cvsync/data"
            port = 8123
            pages_dir = "/srv/site/content/_generated"
            base_url = "https://example.org/"

            [logging]
            level = "debug"

            [mailgun]
            domain = "mg.example.org"
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, Some(PathBuf::from("/srv/cvsync/data")));
        assert_eq!(config.port, Some(8123));
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
        assert_eq!(config.mailgun.domain, "mg.example.org");
        // Unset mailgun keys keep their defaults
        assert_eq!(config.mailgun.to, MailgunConfig::default().to);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config, TomlConfig::default());
    }

    #[test]
    fn test_resolve_port_priority() {
        let toml_config = TomlConfig {
            port: Some(9000),
            ..Default::default()
        };
        assert_eq!(resolve_port(Some(7000), &toml_config), 7000);
        assert_eq!(resolve_port(None, &toml_config), 9000);
        assert_eq!(resolve_port(None, &TomlConfig::default()), DEFAULT_PORT);
    }
}
