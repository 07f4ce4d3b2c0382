use crate::error::{ConfigError, Result};
use crate::filter::FilterCriteria;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 10;

/// Bot settings, read from `config.toml` and overridden by flags/env
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BotConfig {
    pub guild_id: String,
    pub token: String,
    /// Base container filter, e.g. `label=game-server`
    pub filter: String,
    /// Remove registered commands on shutdown
    pub remove_commands: bool,
    pub shutdown_grace_secs: u64,
    pub auto_stop: Option<AutoStopConfig>,
}

/// Auto-stop idle servers. Accepted and validated, not acted on yet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AutoStopConfig {
    pub idle_hours: u32,
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub guild_id: Option<String>,
    pub token: Option<String>,
    pub filter: Option<String>,
    pub remove_commands: Option<bool>,
    pub shutdown_grace_secs: Option<u64>,
    pub auto_stop_hours: Option<u32>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            guild_id: String::new(),
            token: String::new(),
            filter: String::new(),
            remove_commands: true,
            shutdown_grace_secs: DEFAULT_SHUTDOWN_GRACE_SECS,
            auto_stop: None,
        }
    }
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("guild_id", &self.guild_id)
            .field("token", &if self.token.is_empty() { "" } else { "<redacted>" })
            .field("filter", &self.filter)
            .field("remove_commands", &self.remove_commands)
            .field("shutdown_grace_secs", &self.shutdown_grace_secs)
            .field("auto_stop", &self.auto_stop)
            .finish()
    }
}

impl BotConfig {
    /// `<config dir>/dockhand/config.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dockhand")
            .join("config.toml")
    }

    /// Load configuration from a TOML file that must exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::ConfigFileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let content = std::fs::read_to_string(path)?;
        let config: BotConfig = toml::from_str(&content).map_err(|e| ConfigError::InvalidFormat {
            reason: e.to_string(),
        })?;
        info!("📄 Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `path` if present, otherwise start from defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(guild_id) = overrides.guild_id {
            self.guild_id = guild_id;
        }
        if let Some(token) = overrides.token {
            self.token = token;
        }
        if let Some(filter) = overrides.filter {
            self.filter = filter;
        }
        if let Some(remove_commands) = overrides.remove_commands {
            self.remove_commands = remove_commands;
        }
        if let Some(secs) = overrides.shutdown_grace_secs {
            self.shutdown_grace_secs = secs;
        }
        if let Some(idle_hours) = overrides.auto_stop_hours {
            self.auto_stop = Some(AutoStopConfig { idle_hours });
        }
    }

    /// Check the settings needed to connect to the chat platform
    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "token".to_string(),
            }
            .into());
        }
        if self.guild_id.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "guild_id".to_string(),
            }
            .into());
        }
        if let Some(auto_stop) = &self.auto_stop {
            if auto_stop.idle_hours == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "auto_stop.idle_hours".to_string(),
                    reason: "must be at least 1".to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    pub fn base_filter(&self) -> FilterCriteria {
        FilterCriteria::parse(&self.filter)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}
