//! Modelo de vehículo
//!
//! Activos alquilables. Los vehículos nunca se borran físicamente; `Retired` es el
//! estado terminal de baja lógica y las reservas históricas conservan referencias válidas.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Lectura de odómetro por defecto para el primer mantenimiento programado
pub const DEFAULT_SERVICE_INTERVAL_KM: i64 = 10_000;

/// Estado del vehículo - mapea al ENUM `vehicle_status`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "vehicle_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    Available,
    Rented,
    /// Solo para mostrar: se deriva para un vehículo disponible con reserva hoy
    Reserved,
    Unavailable,
    Retired,
}

impl VehicleStatus {
    /// Si el vehículo se puede ofrecer para nuevas reservas
    pub fn is_bookable(self) -> bool {
        !matches!(self, VehicleStatus::Unavailable | VehicleStatus::Retired)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VehicleStatus::Available => "available",
            VehicleStatus::Rented => "rented",
            VehicleStatus::Reserved => "reserved",
            VehicleStatus::Unavailable => "unavailable",
            VehicleStatus::Retired => "retired",
        }
    }
}

/// Fila de vehículo - mapea a la tabla `vehicles`
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Vehicle {
    pub id: Uuid,
    pub model: String,
    pub plate: String,
    pub color: Option<String>,
    pub year: Option<i32>,
    pub daily_rate: Decimal,
    pub distance_rate: Decimal,
    pub odometer: i64,
    pub next_service_odometer: i64,
    pub status: VehicleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vehicle {
    /// Distancia restante hasta el próximo mantenimiento, nunca negativa
    pub fn distance_to_service(&self) -> i64 {
        (self.next_service_odometer - self.odometer).max(0)
    }

    pub fn service_due(&self) -> bool {
        self.distance_to_service() == 0
    }
}

/// Datos necesarios para registrar un vehículo
#[derive(Debug, Clone)]
pub struct NewVehicle {
    pub model: String,
    pub plate: String,
    pub color: Option<String>,
    pub year: Option<i32>,
    pub daily_rate: Decimal,
    pub distance_rate: Decimal,
    pub odometer: i64,
    pub next_service_odometer: i64,
}

impl NewVehicle {
    pub fn into_vehicle(self, id: Uuid, now: DateTime<Utc>) -> Vehicle {
        Vehicle {
            id,
            model: self.model,
            plate: self.plate,
            color: self.color,
            year: self.year,
            daily_rate: self.daily_rate,
            distance_rate: self.distance_rate,
            odometer: self.odometer,
            next_service_odometer: self.next_service_odometer,
            status: VehicleStatus::Available,
            created_at: now,
            updated_at: now,
        }
    }
}
