use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for Workbox
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkboxConfig {
    /// Observability settings
    pub observability: ObservabilityConfig,
    /// Transition engine behaviour
    pub engine: EngineConfig,
    /// Where workflow definitions and items are loaded from
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or filter directive
    pub log_level: String,
    /// Emit JSON log lines instead of plain text
    pub json_logs: bool,
    /// Log transition counters on exit
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            json_logs: false,
            metrics_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Skip the comment step for single-item sends unless asked otherwise
    pub suppress_comment: bool,
    /// Request a refresh whenever an all-in-state transition completes
    pub notify_on_completion: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            suppress_comment: false,
            notify_on_completion: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// TOML fixture with workflows and items
    pub fixture_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            fixture_path: "workbox-store.toml".to_string(),
        }
    }
}

impl WorkboxConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (workbox.toml)
    /// 3. Environment variables (prefixed with WORKBOX_)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("workbox.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut builder = Config::builder();

        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        // WORKBOX_ENGINE__NOTIFY_ON_COMPLETION=false
        builder = builder.add_source(
            Environment::with_prefix("WORKBOX")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
        }
        Ok(())
    }
}
