// Configuration module

mod models;

pub use models::*;

use crate::error::{Result, WorkerError};
use config::{Config, Environment, File};
use std::path::PathBuf;

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest)
    /// 2. Config file (`path`, or `~/.pace-pro/config.toml`)
    /// 3. Defaults (lowest)
    ///
    /// CLI overrides are applied by the caller on the returned value.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let (file, required) = match path {
            Some(p) => (p.to_string(), true),
            None => (Self::default_config_path(), false),
        };

        let config = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&Self::default())?)
            // An explicitly named file must exist; the default one is optional
            .add_source(File::with_name(&file).required(required))
            // Override with environment variables, e.g. PACE_PRO_WORKER__APP_ORIGIN
            .add_source(
                Environment::with_prefix("PACE_PRO")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("worker.precache_urls")
                    .with_list_parse_key("worker.allowed_hosts")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| WorkerError::Config(e.to_string()))?;

        let app: Self = config
            .try_deserialize()
            .map_err(|e| WorkerError::Config(e.to_string()))?;
        app.validate()?;
        Ok(app)
    }

    /// Reject settings the worker cannot run with.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.worker.app_origin).map_err(|e| {
            WorkerError::Config(format!(
                "worker.app_origin '{}' is not a valid URL: {}",
                self.worker.app_origin, e
            ))
        })?;

        if self.worker.version.trim().is_empty() {
            return Err(WorkerError::Config("worker.version must not be empty".to_string()));
        }

        if self.worker.cache_prefix.trim().is_empty() {
            return Err(WorkerError::Config("worker.cache_prefix must not be empty".to_string()));
        }

        Ok(())
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| WorkerError::Config(e.to_string()))
    }

    fn default_config_path() -> String {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".pace-pro")
            .join("config.toml")
            .to_string_lossy()
            .to_string()
    }
}
