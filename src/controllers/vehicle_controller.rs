use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::dto::vehicle_dto::{
    CreateVehicleRequest, UpdateVehicleRequest, VehicleListQuery, VehicleResponse, VehicleSummary,
};
use crate::dto::reservation_dto::AvailabilityQuery;
use crate::dto::ApiResponse;
use crate::middleware::OperatorContext;
use crate::models::{NewVehicle, Vehicle, VehicleStatus};
use crate::repositories::{Ledger, LockScope, LockedView};
use crate::services::availability::{self, RentalPeriod};
use crate::services::vehicle_registry::{self, VehicleUpdate};
use crate::utils::errors::{not_found_error, AppError, AppResult};
use crate::utils::validation::normalize_plate;

pub struct VehicleController {
    ledger: Arc<dyn Ledger>,
}

impl VehicleController {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    async fn respond(&self, vehicle: Vehicle, today: NaiveDate) -> AppResult<VehicleResponse> {
        let bookings = self.ledger.active_bookings().await?;
        let status = availability::display_status(&vehicle, &bookings, today);
        Ok(VehicleResponse::new(vehicle, status))
    }

    pub async fn create(
        &self,
        mut request: CreateVehicleRequest,
        ctx: &OperatorContext,
    ) -> AppResult<ApiResponse<VehicleResponse>> {
        request.plate = normalize_plate(&request.plate);
        request.validate().map_err(AppError::Validation)?;

        let vehicle = NewVehicle::from(request).into_vehicle(Uuid::new_v4(), Utc::now());
        self.ledger.insert_vehicle(&vehicle).await?;

        tracing::info!(
            vehicle_id = %vehicle.id,
            plate = %vehicle.plate,
            operator = %ctx.operator,
            "🚗 Vehículo registrado"
        );

        let response = VehicleResponse::new(vehicle, VehicleStatus::Available);
        Ok(ApiResponse::success_with_message(response, "Vehicle registered"))
    }

    pub async fn get_by_id(&self, id: Uuid, ctx: &OperatorContext) -> AppResult<VehicleResponse> {
        let vehicle = self
            .ledger
            .get_vehicle(id)
            .await?
            .ok_or_else(|| not_found_error("vehicle", id))?;
        self.respond(vehicle, ctx.today).await
    }

    pub async fn list(&self, query: &VehicleListQuery, ctx: &OperatorContext) -> AppResult<Vec<VehicleResponse>> {
        let vehicles = self.ledger.list_vehicles().await?;
        let bookings = self.ledger.active_bookings().await?;

        Ok(vehicles
            .into_iter()
            .filter(|v| query.include_retired || v.status != VehicleStatus::Retired)
            .map(|v| {
                let status = availability::display_status(&v, &bookings, ctx.today);
                VehicleResponse::new(v, status)
            })
            .collect())
    }

    /// Vehículos libres durante el periodo solicitado
    pub async fn available(&self, query: &AvailabilityQuery) -> AppResult<Vec<VehicleSummary>> {
        let period = RentalPeriod::new(query.start, query.end)?;

        let vehicles = self.ledger.list_vehicles().await?;
        let bookings = self.ledger.active_bookings().await?;

        Ok(availability::find_available(&vehicles, &bookings, &period, query.exclude)
            .into_iter()
            .map(VehicleSummary::from)
            .collect())
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateVehicleRequest,
        ctx: &OperatorContext,
    ) -> AppResult<ApiResponse<VehicleResponse>> {
        request.validate().map_err(AppError::Validation)?;
        let patch = VehicleUpdate::from(request);
        patch.validate()?;

        let changes = self
            .ledger
            .with_lock(
                LockScope::vehicle(id),
                Box::new(move |view: &LockedView| vehicle_registry::update(view, id, &patch)),
            )
            .await?;
        let vehicle = changes.written_vehicle(id)?.clone();

        tracing::info!(vehicle_id = %id, operator = %ctx.operator, "✏️ Vehículo actualizado");

        let response = self.respond(vehicle, ctx.today).await?;
        Ok(ApiResponse::success_with_message(response, "Vehicle updated"))
    }

    pub async fn set_status(
        &self,
        id: Uuid,
        status: VehicleStatus,
        ctx: &OperatorContext,
    ) -> AppResult<ApiResponse<VehicleResponse>> {
        let changes = self
            .ledger
            .with_lock(
                LockScope::vehicle(id),
                Box::new(move |view: &LockedView| vehicle_registry::set_status(view, id, status)),
            )
            .await?;
        let vehicle = changes.written_vehicle(id)?.clone();

        tracing::info!(
            vehicle_id = %id,
            status = vehicle.status.as_str(),
            operator = %ctx.operator,
            "🔄 Estado del vehículo cambiado"
        );

        let response = self.respond(vehicle, ctx.today).await?;
        Ok(ApiResponse::success_with_message(response, "Vehicle status updated"))
    }

    pub async fn retire(&self, id: Uuid, ctx: &OperatorContext) -> AppResult<ApiResponse<VehicleResponse>> {
        let changes = self
            .ledger
            .with_lock(
                LockScope::vehicle(id),
                Box::new(move |view: &LockedView| vehicle_registry::retire(view, id)),
            )
            .await?;
        let vehicle = changes.written_vehicle(id)?.clone();

        tracing::info!(vehicle_id = %id, operator = %ctx.operator, "🗑️ Vehículo dado de baja");

        Ok(ApiResponse::success_with_message(
            VehicleResponse::new(vehicle, VehicleStatus::Retired),
            "Vehicle retired",
        ))
    }
}
