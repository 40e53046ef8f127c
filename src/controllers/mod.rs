//! Controladores
//!
//! Validan las peticiones, ejecutan las guardas de registro y de ciclo de vida
//! a través del ledger y dan forma a las respuestas.

pub mod client_controller;
pub mod reservation_controller;
pub mod vehicle_controller;
