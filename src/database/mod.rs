//! Arranque de la base de datos
//!
//! Creación del pool y migraciones del esquema para el ledger PostgreSQL.

pub mod connection;

pub use connection::{connect, mask_database_url};
