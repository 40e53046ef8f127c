//! Middleware HTTP
//!
//! Configuración CORS y contexto del operador por petición.

pub mod cors;
pub mod operator;

pub use cors::cors_layer;
pub use operator::OperatorContext;
