//! Modelo de reserva
//!
//! Ocupación acotada en el tiempo de un vehículo por un cliente, que recorre
//! Reserved → Delivered → Returned, o Reserved → Cancelled.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, Type};
use uuid::Uuid;

use crate::services::availability::RentalPeriod;
use crate::services::billing::Settlement;

/// Franquicia de distancia cuando la reserva no indica una
pub const DEFAULT_FRANCHISE_KM: i64 = 300;

/// Estado de la reserva - mapea al ENUM `reservation_status`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "reservation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Reserved,
    Delivered,
    Returned,
    Cancelled,
}

impl ReservationStatus {
    /// Ocupa el vehículo (cuenta para disponibilidad y comprobaciones referenciales)
    pub fn is_active(self) -> bool {
        matches!(self, ReservationStatus::Reserved | ReservationStatus::Delivered)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Reserved => "reserved",
            ReservationStatus::Delivered => "delivered",
            ReservationStatus::Returned => "returned",
            ReservationStatus::Cancelled => "cancelled",
        }
    }
}

/// Fila de reserva - mapea a la tabla `reservations`
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Reservation {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub client_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: ReservationStatus,
    pub odometer_out: i64,
    pub odometer_in: Option<i64>,
    pub franchise_km: i64,
    pub advance_payment: Decimal,
    pub wash_cost: Decimal,
    pub fines: Decimal,
    pub damages: Decimal,
    pub other_charges: Decimal,
    pub returned_on: Option<NaiveDate>,
    pub settlement: Option<Json<Settlement>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Periodo solicitado, válido por construcción
    pub fn period(&self) -> RentalPeriod {
        RentalPeriod::from_stored(self.start_date, self.end_date)
    }

    pub fn settlement(&self) -> Option<&Settlement> {
        self.settlement.as_ref().map(|s| &s.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_statuses() {
        assert!(ReservationStatus::Reserved.is_active());
        assert!(ReservationStatus::Delivered.is_active());
        assert!(ReservationStatus::Returned.is_terminal());
        assert!(ReservationStatus::Cancelled.is_terminal());
    }
}
