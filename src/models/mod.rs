//! Modelos de datos
//!
//! Registros que mapean uno a uno al esquema PostgreSQL de `migrations/`.

pub mod client;
pub mod reservation;
pub mod vehicle;

pub use client::{Client, ClientStatus, NewClient};
pub use reservation::{Reservation, ReservationStatus, DEFAULT_FRANCHISE_KM};
pub use vehicle::{NewVehicle, Vehicle, VehicleStatus, DEFAULT_SERVICE_INTERVAL_KM};
