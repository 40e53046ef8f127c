use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{NewVehicle, Vehicle, VehicleStatus, DEFAULT_SERVICE_INTERVAL_KM};
use crate::services::vehicle_registry::VehicleUpdate;

// Petición para registrar un vehículo
#[derive(Debug, Deserialize, Validate)]
pub struct CreateVehicleRequest {
    #[validate(length(min = 1, max = 100), custom = "crate::utils::validation::validate_not_blank")]
    pub model: String,
    #[validate(regex = "crate::utils::validation::PLATE_REGEX")]
    pub plate: String,
    #[validate(length(max = 50))]
    pub color: Option<String>,
    #[validate(range(min = 1900, max = 2100))]
    pub year: Option<i32>,
    #[validate(custom = "crate::utils::validation::validate_amount")]
    pub daily_rate: Decimal,
    #[validate(custom = "crate::utils::validation::validate_amount")]
    pub distance_rate: Decimal,
    #[validate(range(min = 0))]
    pub odometer: Option<i64>,
    #[validate(range(min = 0))]
    pub next_service_odometer: Option<i64>,
}

impl From<CreateVehicleRequest> for NewVehicle {
    fn from(request: CreateVehicleRequest) -> Self {
        let odometer = request.odometer.unwrap_or(0);
        NewVehicle {
            model: request.model.trim().to_string(),
            plate: request.plate,
            color: request.color,
            year: request.year,
            daily_rate: request.daily_rate,
            distance_rate: request.distance_rate,
            odometer,
            next_service_odometer: request
                .next_service_odometer
                .unwrap_or(odometer.saturating_add(DEFAULT_SERVICE_INTERVAL_KM)),
        }
    }
}

// Petición para actualizar un vehículo; la placa queda fija al registrarlo
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateVehicleRequest {
    #[validate(length(min = 1, max = 100))]
    pub model: Option<String>,
    #[validate(length(max = 50))]
    pub color: Option<String>,
    #[validate(range(min = 1900, max = 2100))]
    pub year: Option<i32>,
    #[validate(custom = "crate::utils::validation::validate_amount")]
    pub daily_rate: Option<Decimal>,
    #[validate(custom = "crate::utils::validation::validate_amount")]
    pub distance_rate: Option<Decimal>,
    #[validate(range(min = 0))]
    pub odometer: Option<i64>,
    #[validate(range(min = 0))]
    pub next_service_odometer: Option<i64>,
}

impl From<UpdateVehicleRequest> for VehicleUpdate {
    fn from(request: UpdateVehicleRequest) -> Self {
        VehicleUpdate {
            model: request.model,
            color: request.color,
            year: request.year,
            daily_rate: request.daily_rate,
            distance_rate: request.distance_rate,
            odometer: request.odometer,
            next_service_odometer: request.next_service_odometer,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetVehicleStatusRequest {
    pub status: VehicleStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct VehicleListQuery {
    #[serde(default)]
    pub include_retired: bool,
}

// Respuesta de vehículo con campos de mantenimiento derivados y estado visible
#[derive(Debug, Serialize, Deserialize)]
pub struct VehicleResponse {
    pub id: Uuid,
    pub model: String,
    pub plate: String,
    pub color: Option<String>,
    pub year: Option<i32>,
    pub daily_rate: Decimal,
    pub distance_rate: Decimal,
    pub odometer: i64,
    pub next_service_odometer: i64,
    pub distance_to_service: i64,
    pub service_due: bool,
    pub status: VehicleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VehicleResponse {
    pub fn new(vehicle: Vehicle, display_status: VehicleStatus) -> Self {
        Self {
            distance_to_service: vehicle.distance_to_service(),
            service_due: vehicle.service_due(),
            id: vehicle.id,
            model: vehicle.model,
            plate: vehicle.plate,
            color: vehicle.color,
            year: vehicle.year,
            daily_rate: vehicle.daily_rate,
            distance_rate: vehicle.distance_rate,
            odometer: vehicle.odometer,
            next_service_odometer: vehicle.next_service_odometer,
            status: display_status,
            created_at: vehicle.created_at,
            updated_at: vehicle.updated_at,
        }
    }
}

// Entrada de una consulta de disponibilidad
#[derive(Debug, Serialize, Deserialize)]
pub struct VehicleSummary {
    pub id: Uuid,
    pub model: String,
    pub plate: String,
    pub daily_rate: Decimal,
    pub distance_rate: Decimal,
}

impl From<&Vehicle> for VehicleSummary {
    fn from(vehicle: &Vehicle) -> Self {
        Self {
            id: vehicle.id,
            model: vehicle.model.clone(),
            plate: vehicle.plate.clone(),
            daily_rate: vehicle.daily_rate,
            distance_rate: vehicle.distance_rate,
        }
    }
}
