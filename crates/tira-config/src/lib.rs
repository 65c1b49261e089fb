//! # tira-config
//!
//! Configuration management for Tiramisu incognito I/O.
//!
//! Loads configuration from:
//! 1. `~/.tira/config.toml` (global)
//! 2. `.tira/config.toml` (project-local, overrides global)
//! 3. Environment variables (highest priority)

pub mod logging;
pub mod testing;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

use tira_session::MAX_TRACKED_FILES;

/// Global config instance
static CONFIG: Lazy<RwLock<Config>> = Lazy::new(|| RwLock::new(Config::load().unwrap_or_default()));

/// Get global config (read-only)
pub fn config() -> std::sync::RwLockReadGuard<'static, Config> {
    CONFIG.read().unwrap()
}

/// Reload config from disk
pub fn reload() -> Result<(), ConfigError> {
    let new_config = Config::load()?;
    *CONFIG.write().unwrap() = new_config;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load config from standard locations
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // 1. Load global config (~/.tira/config.toml)
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                debug!("Loading global config from {:?}", global_path);
                let contents = std::fs::read_to_string(&global_path)?;
                config = toml::from_str(&contents)?;
            }
        }

        // 2. Load project config (.tira/config.toml) - overrides global
        let project_path = Path::new(".tira/config.toml");
        if project_path.exists() {
            debug!("Loading project config from {:?}", project_path);
            let contents = std::fs::read_to_string(project_path)?;
            let project_config: Config = toml::from_str(&contents)?;
            config.merge(project_config);
        }

        // 3. Apply environment variable overrides
        config.apply_env_overrides();

        Ok(config)
    }

    /// Global config path: ~/.tira/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".tira/config.toml"))
    }

    /// Merge another config (project overrides)
    fn merge(&mut self, other: Config) {
        if other.session.capacity != SessionConfig::default().capacity {
            self.session.capacity = other.session.capacity;
        }
        if other.session.shadow_dir.is_some() {
            self.session.shadow_dir = other.session.shadow_dir;
        }
        if other.logging.level != LoggingConfig::default().level {
            self.logging.level = other.logging.level;
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(capacity) = std::env::var("TIRA_CAPACITY") {
            if let Ok(n) = capacity.parse() {
                self.session.capacity = n;
            }
        }
        if let Ok(dir) = std::env::var("TIRA_SHADOW_DIR") {
            self.session.shadow_dir = Some(PathBuf::from(dir));
        }
        if let Ok(level) = std::env::var("TIRA_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Generate default config TOML string
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Config::default()).unwrap()
    }
}

/// Incognito session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum number of files tracked per session
    pub capacity: usize,
    /// Directory for shadow copies (None = alongside the original)
    pub shadow_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capacity: MAX_TRACKED_FILES,
            shadow_dir: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level filter: error, warn, info, debug, trace
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.session.capacity, MAX_TRACKED_FILES);
        assert!(config.session.shadow_dir.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[session]"));
        assert!(toml_str.contains("[logging]"));
        assert!(toml_str.contains("capacity"));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.session.capacity, parsed.session.capacity);
    }

    #[test]
    fn test_merge_prefers_project_overrides() {
        let mut base = Config::default();
        let project = Config {
            session: SessionConfig {
                capacity: 16,
                shadow_dir: Some(PathBuf::from("/tmp/shadows")),
            },
            logging: LoggingConfig::default(),
        };
        base.merge(project);
        assert_eq!(base.session.capacity, 16);
        assert_eq!(base.session.shadow_dir, Some(PathBuf::from("/tmp/shadows")));
    }
}
