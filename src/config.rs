//! # Configuration Management
//!
//! Loads application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Environment variables (APP_SERVER_HOST, APP_SERVER_PORT, etc.)
//! 2. Configuration file (config.toml)
//! 3. Default values (defined in the Default impl)
//!
//! The bare `HOST` and `PORT` variables used by deployment platforms and
//! container runtimes override everything else.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub storage: StorageConfig,
}

/// Server bind settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Transcription engine settings.
///
/// ## Fields:
/// - `program`: the Basic Pitch command-line front end to invoke
/// - `model`: path to model weights; empty string selects the engine's
///   built-in default (the ICASSP 2022 model)
/// - `version`: version string reported by `/health` when probing the
///   engine binary fails
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub program: String,
    pub model: String,
    pub version: String,
}

/// Scratch storage settings for per-request workspaces.
///
/// ## Fields:
/// - `scratch_dir`: directory under which each request gets its own
///   uniquely-named workspace; created if missing
/// - `max_upload_bytes`: uploads larger than this are rejected before any
///   workspace is created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub scratch_dir: String,
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            engine: EngineConfig {
                program: "basic-pitch".to_string(),
                model: String::new(),
                version: "unknown".to_string(),
            },
            storage: StorageConfig {
                scratch_dir: env::temp_dir().to_string_lossy().into_owned(),
                max_upload_bytes: 50 * 1024 * 1024,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, config.toml, and the environment,
    /// in that order.
    ///
    /// `HOST` and `PORT` are handled separately because deployment
    /// platforms set them without the APP_ prefix.
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense before the server
    /// starts accepting requests.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.engine.program.is_empty() {
            return Err(anyhow::anyhow!("Engine program cannot be empty"));
        }

        if self.storage.scratch_dir.is_empty() {
            return Err(anyhow::anyhow!("Scratch directory cannot be empty"));
        }

        if self.storage.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("Max upload size must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.engine.program, "basic-pitch");
        assert!(config.engine.model.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_rejects_port_zero() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_empty_scratch_dir() {
        let mut config = AppConfig::default();
        config.storage.scratch_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_zero_upload_cap() {
        let mut config = AppConfig::default();
        config.storage.max_upload_bytes = 0;
        assert!(config.validate().is_err());
    }
}
