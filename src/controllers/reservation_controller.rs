use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::dto::reservation_dto::{
    BookingConfirmation, CreateReservationRequest, DeliverRequest, DeliveryReceipt, ReservationListQuery,
    ReservationResponse, ReturnRequest, SettlementResponse, UpdateReservationRequest,
};
use crate::dto::ApiResponse;
use crate::middleware::OperatorContext;
use crate::models::Reservation;
use crate::repositories::{Ledger, LockScope, LockedView};
use crate::services::availability::RentalPeriod;
use crate::services::lifecycle::{self, Handover, NewBooking, ReservationPatch, VehicleReturn};
use crate::utils::errors::{not_found_error, AppError, AppResult};

pub struct ReservationController {
    ledger: Arc<dyn Ledger>,
    default_franchise_km: i64,
}

impl ReservationController {
    pub fn new(ledger: Arc<dyn Ledger>, default_franchise_km: i64) -> Self {
        Self {
            ledger,
            default_franchise_km,
        }
    }

    async fn load(&self, id: Uuid) -> AppResult<Reservation> {
        self.ledger
            .get_reservation(id)
            .await?
            .ok_or_else(|| not_found_error("reservation", id))
    }

    pub async fn create(
        &self,
        request: CreateReservationRequest,
        ctx: &OperatorContext,
    ) -> AppResult<ApiResponse<BookingConfirmation>> {
        request.validate().map_err(AppError::Validation)?;
        let period = RentalPeriod::new(request.start_date, request.end_date)?;

        let booking = NewBooking {
            id: Uuid::new_v4(),
            vehicle_id: request.vehicle_id,
            client_id: request.client_id,
            period,
            franchise_km: request.franchise_km.unwrap_or(self.default_franchise_km),
            advance_payment: request.advance_payment.unwrap_or(Decimal::ZERO),
            created_by: ctx.operator.clone(),
            created_at: Utc::now(),
        };
        let id = booking.id;
        let scope = LockScope::vehicle(booking.vehicle_id).with_client(booking.client_id);

        let changes = self
            .ledger
            .with_lock(scope, Box::new(move |view: &LockedView| lifecycle::create(view, &booking)))
            .await?;
        let reservation = changes.written_reservation(id)?.clone();

        let vehicle = self
            .ledger
            .get_vehicle(reservation.vehicle_id)
            .await?
            .ok_or_else(|| not_found_error("vehicle", reservation.vehicle_id))?;
        let projected = lifecycle::projected_time_charge(&reservation.period(), &vehicle)?;
        let advance_exceeds_projection = reservation.advance_payment > projected;

        tracing::info!(
            reservation_id = %id,
            vehicle_id = %reservation.vehicle_id,
            client_id = %reservation.client_id,
            start = %reservation.start_date,
            end = %reservation.end_date,
            operator = %ctx.operator,
            "✅ Reserva creada"
        );
        if advance_exceeds_projection {
            tracing::warn!(
                reservation_id = %id,
                advance = %reservation.advance_payment,
                projected = %projected,
                "⚠️ El anticipo supera el cargo por tiempo proyectado"
            );
        }

        let confirmation = BookingConfirmation {
            reservation_id: id,
            status: reservation.status,
            vehicle_id: reservation.vehicle_id,
            client_id: reservation.client_id,
            start_date: reservation.start_date,
            end_date: reservation.end_date,
            franchise_km: reservation.franchise_km,
            advance_payment: reservation.advance_payment,
            projected_time_charge: projected,
            advance_exceeds_projection,
        };
        let message = if advance_exceeds_projection {
            "Reservation created; advance payment exceeds the projected time charge"
        } else {
            "Reservation created"
        };
        Ok(ApiResponse::success_with_message(confirmation, message))
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<ReservationResponse> {
        self.load(id).await.map(ReservationResponse::from)
    }

    pub async fn list(&self, query: &ReservationListQuery) -> AppResult<Vec<ReservationResponse>> {
        let reservations = self.ledger.list_reservations(query.status).await?;
        Ok(reservations.into_iter().map(ReservationResponse::from).collect())
    }

    pub async fn deliver(
        &self,
        id: Uuid,
        request: DeliverRequest,
        ctx: &OperatorContext,
    ) -> AppResult<ApiResponse<DeliveryReceipt>> {
        request.validate().map_err(AppError::Validation)?;

        // El cliente de una reserva nunca cambia, se puede incluir en el alcance de antemano
        let client_id = self.load(id).await?.client_id;
        let handover = Handover {
            odometer_out: request.odometer_out,
            start_date: request.start_date,
        };

        let changes = self
            .ledger
            .with_lock(
                LockScope::reservation(id).with_client(client_id),
                Box::new(move |view: &LockedView| lifecycle::deliver(view, id, &handover)),
            )
            .await?;
        let reservation = changes.written_reservation(id)?;
        let vehicle = changes.written_vehicle(reservation.vehicle_id)?;
        let client = self
            .ledger
            .get_client(client_id)
            .await?
            .ok_or_else(|| not_found_error("client", client_id))?;

        tracing::info!(
            reservation_id = %id,
            vehicle_id = %vehicle.id,
            odometer_out = reservation.odometer_out,
            operator = %ctx.operator,
            "🔑 Vehículo entregado"
        );

        let receipt = DeliveryReceipt {
            reservation_id: id,
            vehicle_id: vehicle.id,
            plate: vehicle.plate.clone(),
            model: vehicle.model.clone(),
            client_id,
            client_name: client.name,
            license_number: client.license_number,
            start_date: reservation.start_date,
            end_date: reservation.end_date,
            odometer_out: reservation.odometer_out,
            franchise_km: reservation.franchise_km,
            daily_rate: vehicle.daily_rate,
            distance_rate: vehicle.distance_rate,
            advance_payment: reservation.advance_payment,
            operator: ctx.operator.clone(),
        };
        Ok(ApiResponse::success_with_message(receipt, "Vehicle delivered"))
    }

    fn vehicle_return(request: &ReturnRequest, ctx: &OperatorContext) -> VehicleReturn {
        VehicleReturn {
            odometer_in: request.odometer_in,
            adjustments: request.adjustments(),
            return_date: request.return_date.unwrap_or(ctx.today),
        }
    }

    /// Liquidación que produciría la devolución, sin registrar nada
    pub async fn preview_return(
        &self,
        id: Uuid,
        request: ReturnRequest,
        ctx: &OperatorContext,
    ) -> AppResult<ApiResponse<SettlementResponse>> {
        request.validate().map_err(AppError::Validation)?;
        let ret = Self::vehicle_return(&request, ctx);

        let reservation = self.load(id).await?;
        let vehicle = self
            .ledger
            .get_vehicle(reservation.vehicle_id)
            .await?
            .ok_or_else(|| not_found_error("vehicle", reservation.vehicle_id))?;
        let view = LockedView {
            reservation: Some(reservation),
            vehicles: vec![vehicle],
            ..LockedView::default()
        };

        let settlement = lifecycle::preview_return(&view, id, &ret)?;
        Ok(ApiResponse::success(SettlementResponse::new(id, settlement)))
    }

    pub async fn return_vehicle(
        &self,
        id: Uuid,
        request: ReturnRequest,
        ctx: &OperatorContext,
    ) -> AppResult<ApiResponse<SettlementResponse>> {
        request.validate().map_err(AppError::Validation)?;
        let ret = Self::vehicle_return(&request, ctx);

        let changes = self
            .ledger
            .with_lock(
                LockScope::reservation(id),
                Box::new(move |view: &LockedView| lifecycle::return_vehicle(view, id, &ret)),
            )
            .await?;
        let reservation = changes.written_reservation(id)?;
        let settlement = reservation
            .settlement()
            .cloned()
            .ok_or_else(|| AppError::Internal(format!("returned reservation {} has no settlement", id)))?;

        tracing::info!(
            reservation_id = %id,
            vehicle_id = %reservation.vehicle_id,
            odometer_in = ?reservation.odometer_in,
            total = %settlement.total,
            operator = %ctx.operator,
            "🏁 Vehículo devuelto"
        );

        Ok(ApiResponse::success_with_message(
            SettlementResponse::new(id, settlement),
            "Vehicle returned",
        ))
    }

    pub async fn cancel(&self, id: Uuid, ctx: &OperatorContext) -> AppResult<ApiResponse<ReservationResponse>> {
        let changes = self
            .ledger
            .with_lock(
                LockScope::reservation(id),
                Box::new(move |view: &LockedView| lifecycle::cancel(view, id)),
            )
            .await?;
        let reservation = changes.written_reservation(id)?.clone();

        tracing::info!(reservation_id = %id, operator = %ctx.operator, "❌ Reserva cancelada");

        Ok(ApiResponse::success_with_message(
            ReservationResponse::from(reservation),
            "Reservation cancelled",
        ))
    }

    pub async fn edit(
        &self,
        id: Uuid,
        request: UpdateReservationRequest,
        ctx: &OperatorContext,
    ) -> AppResult<ApiResponse<ReservationResponse>> {
        request.validate().map_err(AppError::Validation)?;
        let patch = ReservationPatch::from(request);
        patch.validate()?;

        let mut scope = LockScope::reservation(id);
        if let Some(vehicle_id) = patch.vehicle_id {
            scope = scope.with_vehicle(vehicle_id);
        }

        let changes = self
            .ledger
            .with_lock(scope, Box::new(move |view: &LockedView| lifecycle::edit(view, id, &patch)))
            .await?;
        let reservation = changes.written_reservation(id)?.clone();

        tracing::info!(
            reservation_id = %id,
            vehicle_id = %reservation.vehicle_id,
            operator = %ctx.operator,
            "✏️ Reserva editada"
        );

        Ok(ApiResponse::success_with_message(
            ReservationResponse::from(reservation),
            "Reservation updated",
        ))
    }
}
