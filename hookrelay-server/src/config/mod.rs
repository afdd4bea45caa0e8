//! Configuration module for hookrelay-server.
//!
//! Handles loading configuration from the TOML file, CLI arguments and
//! environment variables.

pub mod file;

use crate::config::file::FileConfig;
use hookrelay_core::config::{
    ChannelTableError, ChannelTargets, ClassifierConfig, DedupConfig, DispatchConfig,
};
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("invalid channel table: {0}")]
    ChannelTable(#[from] ChannelTableError),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Validated configuration, split by concern.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub listen: SocketAddr,
    pub dedup: DedupConfig,
    pub dispatch: DispatchConfig,
    /// Reloadable.
    pub classifier: ClassifierConfig,
    /// Reloadable.
    pub channels: ChannelTargets,
}

impl LoadedConfig {
    /// Names of the restart-only sections that differ between `self` and
    /// `other`.
    pub fn restart_only_changes(&self, other: &LoadedConfig) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.listen != other.listen {
            changed.push("server");
        }
        if self.dedup != other.dedup {
            changed.push("dedup");
        }
        if self.dispatch != other.dispatch {
            changed.push("dispatch");
        }
        changed
    }
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Build the loaded configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        Self::parse(&config_content, self.listen_override)
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn parse(
        content: &str,
        listen_override: Option<SocketAddr>,
    ) -> Result<LoadedConfig, ConfigError> {
        let mut file_config: FileConfig = toml::from_str(content)?;

        if let Some(listen) = listen_override {
            file_config.server.listen = listen;
        }

        Self::validate(&file_config)?;

        Ok(LoadedConfig {
            listen: file_config.server.listen,
            dedup: DedupConfig::from(&file_config.dedup),
            dispatch: DispatchConfig::from(&file_config.dispatch),
            classifier: ClassifierConfig::from(&file_config.classifier),
            channels: file_config.channel_targets()?,
        })
    }

    fn validate(config: &FileConfig) -> Result<(), ConfigError> {
        let dedup = &config.dedup;
        if dedup.trim_target > dedup.soft_cap {
            return Err(ConfigError::ValidationError(format!(
                "dedup.trim_target ({}) must not exceed dedup.soft_cap ({})",
                dedup.trim_target, dedup.soft_cap
            )));
        }
        if dedup.primary_retention_secs == 0 || dedup.high_value_retention_secs == 0 {
            return Err(ConfigError::ValidationError(
                "dedup retention windows must be positive".to_string(),
            ));
        }
        if dedup.sweep_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "dedup.sweep_interval_secs must be positive".to_string(),
            ));
        }
        if config.dispatch.workers == 0 {
            return Err(ConfigError::ValidationError(
                "dispatch.workers must be at least 1".to_string(),
            ));
        }
        if config.dispatch.delivery_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "dispatch.delivery_timeout_secs must be positive".to_string(),
            ));
        }
        let threshold = config.classifier.high_value_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "classifier.high_value_threshold must be a non-negative number, got {threshold}"
            )));
        }
        Ok(())
    }
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookrelay_sdk::objects::ChannelTag;

    fn config(extra: &str) -> String {
        let mut content = String::from(extra);
        for tag in ChannelTag::ALL {
            content.push_str(&format!(
                "\n[channels.{tag}]\nurl = \"https://hooks.example.com/{tag}\"\n"
            ));
        }
        content
    }

    #[test]
    fn test_listen_override() {
        let addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        let loaded = ConfigLoader::parse(&config(""), Some(addr)).unwrap();
        assert_eq!(loaded.listen, addr);
        assert_eq!(loaded.dispatch, DispatchConfig::default());
    }

    #[test]
    fn test_trim_target_above_soft_cap_is_rejected() {
        let content = config("[dedup]\nsoft_cap = 100\ntrim_target = 200\n");
        assert!(matches!(
            ConfigLoader::parse(&content, None),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_zero_workers_is_rejected() {
        let content = config("[dispatch]\nworkers = 0\n");
        assert!(matches!(
            ConfigLoader::parse(&content, None),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_missing_channel_is_rejected() {
        let content = "[channels.NORMAL]\nurl = \"https://hooks.example.com/n\"\n";
        assert!(matches!(
            ConfigLoader::parse(content, None),
            Err(ConfigError::ChannelTable(_))
        ));
    }

    #[test]
    fn test_restart_only_changes() {
        let before = ConfigLoader::parse(&config(""), None).unwrap();
        let after = ConfigLoader::parse(
            &config("[dispatch]\nworkers = 9\n[classifier]\npopulation_ceiling = 5\n"),
            None,
        )
        .unwrap();
        assert_eq!(before.restart_only_changes(&after), vec!["dispatch"]);
    }

    #[test]
    fn test_load_reads_file() {
        let dir = std::env::temp_dir().join(format!("hookrelay-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("hookrelay.toml");
        std::fs::write(&path, config("")).unwrap();

        let loaded = ConfigLoader::new(&path, None).load().unwrap();
        assert_eq!(loaded.classifier, ClassifierConfig::default());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
