//! Servicios de dominio
//!
//! Lógica pura del alquiler: disponibilidad, facturación y las guardas que se
//! ejecutan bajo el bloqueo del ledger para reservas y ambos registros.

pub mod availability;
pub mod billing;
pub mod client_registry;
pub mod lifecycle;
pub mod vehicle_registry;
