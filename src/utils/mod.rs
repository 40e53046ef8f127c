//! Utilidades compartidas
//!
//! Tipos de error y helpers de validación de entrada.

pub mod errors;
pub mod validation;
