//! Configuración
//!
//! Parámetros del servidor y de la base de datos leídos del entorno (y de `.env`).

pub mod database;
pub mod environment;

pub use database::DatabaseConfig;
pub use environment::{ConfigError, EnvironmentConfig, StorageBackend};
