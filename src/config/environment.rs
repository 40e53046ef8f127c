//! Configuración de variables de entorno
//!
//! Cada valor tiene un valor por defecto salvo donde se indica; un valor presente
//! pero mal formado es un [`ConfigError`].

use std::env;
use std::str::FromStr;
use thiserror::Error;

use crate::models::DEFAULT_FRANCHISE_KM;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Dónde guarda el ledger sus registros
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(()),
        }
    }
}

/// Interpretar `key` con `lookup`, usando `default` si no está definida
pub(crate) fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub log_level: tracing::Level,
    pub storage_backend: StorageBackend,
    pub cors_origins: Vec<String>,
    pub default_franchise_km: i64,
}

impl EnvironmentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let default_franchise_km = parse_or(&lookup, "DEFAULT_FRANCHISE_KM", DEFAULT_FRANCHISE_KM)?;
        if default_franchise_km < 0 {
            return Err(ConfigError::Invalid {
                key: "DEFAULT_FRANCHISE_KM",
                value: default_franchise_km.to_string(),
            });
        }

        Ok(Self {
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 3000)?,
            log_level: parse_or(&lookup, "LOG_LEVEL", tracing::Level::INFO)?,
            storage_backend: parse_or(&lookup, "STORAGE_BACKEND", StorageBackend::Postgres)?,
            cors_origins: lookup("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            default_franchise_km,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: tracing::Level::INFO,
            storage_backend: StorageBackend::Memory,
            cors_origins: Vec::new(),
            default_franchise_km: DEFAULT_FRANCHISE_KM,
        }
    }
}
