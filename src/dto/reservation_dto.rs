use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Reservation, ReservationStatus};
use crate::services::billing::{Settlement, SettlementKind};
use crate::services::lifecycle::{Adjustments, ReservationPatch};

// Consulta de disponibilidad
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub exclude: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReservationListQuery {
    pub status: Option<ReservationStatus>,
}

// Petición para reservar un vehículo
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReservationRequest {
    pub vehicle_id: Uuid,
    pub client_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(range(min = 0))]
    pub franchise_km: Option<i64>,
    #[validate(custom = "crate::utils::validation::validate_amount")]
    pub advance_payment: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub reservation_id: Uuid,
    pub status: ReservationStatus,
    pub vehicle_id: Uuid,
    pub client_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub franchise_km: i64,
    pub advance_payment: Decimal,
    pub projected_time_charge: Decimal,
    /// Aviso suave: el anticipo supera el cargo por tiempo proyectado
    pub advance_exceeds_projection: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DeliverRequest {
    #[validate(range(min = 0))]
    pub odometer_out: i64,
    pub start_date: Option<NaiveDate>,
}

// Datos que recibe el generador del contrato en la entrega
#[derive(Debug, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub reservation_id: Uuid,
    pub vehicle_id: Uuid,
    pub plate: String,
    pub model: String,
    pub client_id: Uuid,
    pub client_name: String,
    pub license_number: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub odometer_out: i64,
    pub franchise_km: i64,
    pub daily_rate: Decimal,
    pub distance_rate: Decimal,
    pub advance_payment: Decimal,
    pub operator: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReturnRequest {
    #[validate(range(min = 0))]
    pub odometer_in: i64,
    #[validate(custom = "crate::utils::validation::validate_amount")]
    pub wash_cost: Option<Decimal>,
    #[validate(custom = "crate::utils::validation::validate_amount")]
    pub fines: Option<Decimal>,
    #[validate(custom = "crate::utils::validation::validate_amount")]
    pub damages: Option<Decimal>,
    #[validate(custom = "crate::utils::validation::validate_amount")]
    pub other_charges: Option<Decimal>,
    /// Por defecto, el día actual del operador
    pub return_date: Option<NaiveDate>,
}

impl ReturnRequest {
    pub fn adjustments(&self) -> Adjustments {
        Adjustments {
            wash_cost: self.wash_cost.unwrap_or_default(),
            fines: self.fines.unwrap_or_default(),
            damages: self.damages.unwrap_or_default(),
            other_charges: self.other_charges.unwrap_or_default(),
        }
    }
}

// Liquidación etiquetada para mostrar; solo uno de los importes viene informado
#[derive(Debug, Serialize, Deserialize)]
pub struct SettlementResponse {
    pub reservation_id: Uuid,
    pub kind: SettlementKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_due: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_to_refund: Option<Decimal>,
    pub settlement: Settlement,
}

impl SettlementResponse {
    pub fn new(reservation_id: Uuid, settlement: Settlement) -> Self {
        let kind = settlement.kind();
        let (amount_due, amount_to_refund) = match kind {
            SettlementKind::AmountDue => (Some(settlement.balance()), None),
            SettlementKind::Refund => (None, Some(settlement.balance())),
        };
        Self {
            reservation_id,
            kind,
            amount_due,
            amount_to_refund,
            settlement,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateReservationRequest {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub vehicle_id: Option<Uuid>,
    #[validate(range(min = 0))]
    pub franchise_km: Option<i64>,
    #[validate(custom = "crate::utils::validation::validate_amount")]
    pub advance_payment: Option<Decimal>,
    #[validate(custom = "crate::utils::validation::validate_amount")]
    pub wash_cost: Option<Decimal>,
    #[validate(custom = "crate::utils::validation::validate_amount")]
    pub fines: Option<Decimal>,
    #[validate(custom = "crate::utils::validation::validate_amount")]
    pub damages: Option<Decimal>,
    #[validate(custom = "crate::utils::validation::validate_amount")]
    pub other_charges: Option<Decimal>,
}

impl From<UpdateReservationRequest> for ReservationPatch {
    fn from(request: UpdateReservationRequest) -> Self {
        ReservationPatch {
            start_date: request.start_date,
            end_date: request.end_date,
            vehicle_id: request.vehicle_id,
            franchise_km: request.franchise_km,
            advance_payment: request.advance_payment,
            wash_cost: request.wash_cost,
            fines: request.fines,
            damages: request.damages,
            other_charges: request.other_charges,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReservationResponse {
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
    pub settlement: Option<Settlement>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationResponse {
    fn from(r: Reservation) -> Self {
        Self {
            id: r.id,
            vehicle_id: r.vehicle_id,
            client_id: r.client_id,
            start_date: r.start_date,
            end_date: r.end_date,
            status: r.status,
            odometer_out: r.odometer_out,
            odometer_in: r.odometer_in,
            franchise_km: r.franchise_km,
            advance_payment: r.advance_payment,
            wash_cost: r.wash_cost,
            fines: r.fines,
            damages: r.damages,
            other_charges: r.other_charges,
            returned_on: r.returned_on,
            settlement: r.settlement.map(|s| s.0),
            created_by: r.created_by,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
