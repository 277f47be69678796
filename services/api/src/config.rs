//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use aura_tarot_core::{AiProvider, PasswordScheme};
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    /// JSON file backing the key-value store. `None` keeps everything in memory.
    pub data_path: Option<PathBuf>,
    pub password_scheme: PasswordScheme,
    pub max_readings: Option<usize>,
    pub cors_origin: String,
    /// Keys used when a profile has not entered its own.
    pub provider_keys: HashMap<AiProvider, String>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_address_str =
            lookup("BIND_ADDRESS").unwrap_or_else(|| "127.0.0.1:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let data_path = lookup("DATA_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let password_scheme = match lookup("PASSWORD_SCHEME")
            .map(|s| s.to_lowercase())
            .as_deref()
        {
            None | Some("sha256") => PasswordScheme::Sha256,
            Some("argon2") => PasswordScheme::Argon2,
            Some(other) => {
                return Err(ConfigError::InvalidValue(
                    "PASSWORD_SCHEME".to_string(),
                    format!("'{}' is not one of sha256, argon2", other),
                ))
            }
        };

        let max_readings = match lookup("MAX_READINGS") {
            None => None,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(0) | Err(_) => {
                    return Err(ConfigError::InvalidValue(
                        "MAX_READINGS".to_string(),
                        format!("'{}' is not a positive integer", raw),
                    ))
                }
                Ok(n) => Some(n),
            },
        };

        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:5173".to_string());

        // --- Load fallback API keys (all optional) ---
        let mut provider_keys = HashMap::new();
        for (provider, var) in [
            (AiProvider::Gemini, "GEMINI_API_KEY"),
            (AiProvider::Deepseek, "DEEPSEEK_API_KEY"),
            (AiProvider::Qwen, "QWEN_API_KEY"),
            (AiProvider::Kimi, "KIMI_API_KEY"),
        ] {
            if let Some(key) = lookup(var).filter(|k| !k.trim().is_empty()) {
                provider_keys.insert(provider, key);
            }
        }

        Ok(Self {
            bind_address,
            log_level,
            data_path,
            password_scheme,
            max_readings,
            cors_origin,
            provider_keys,
        })
    }
}
