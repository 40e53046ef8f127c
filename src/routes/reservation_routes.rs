use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::reservation_controller::ReservationController;
use crate::dto::reservation_dto::{
    BookingConfirmation, CreateReservationRequest, DeliverRequest, DeliveryReceipt, ReservationListQuery,
    ReservationResponse, ReturnRequest, SettlementResponse, UpdateReservationRequest,
};
use crate::dto::ApiResponse;
use crate::middleware::OperatorContext;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_reservation_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_reservation).get(list_reservations))
        .route("/:id", get(get_reservation).patch(edit_reservation))
        .route("/:id/deliver", post(deliver_reservation))
        .route("/:id/settlement-preview", post(preview_return))
        .route("/:id/return", post(return_vehicle))
        .route("/:id/cancel", post(cancel_reservation))
}

fn controller(state: &AppState) -> ReservationController {
    ReservationController::new(state.ledger.clone(), state.config.default_franchise_km)
}

async fn create_reservation(
    State(state): State<AppState>,
    ctx: OperatorContext,
    Json(request): Json<CreateReservationRequest>,
) -> Result<Json<ApiResponse<BookingConfirmation>>, AppError> {
    let response = controller(&state).create(request, &ctx).await?;
    Ok(Json(response))
}

async fn list_reservations(
    State(state): State<AppState>,
    Query(query): Query<ReservationListQuery>,
) -> Result<Json<ApiResponse<Vec<ReservationResponse>>>, AppError> {
    let response = controller(&state).list(&query).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReservationResponse>>, AppError> {
    let response = controller(&state).get_by_id(id).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn edit_reservation(
    State(state): State<AppState>,
    ctx: OperatorContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateReservationRequest>,
) -> Result<Json<ApiResponse<ReservationResponse>>, AppError> {
    let response = controller(&state).edit(id, request, &ctx).await?;
    Ok(Json(response))
}

async fn deliver_reservation(
    State(state): State<AppState>,
    ctx: OperatorContext,
    Path(id): Path<Uuid>,
    Json(request): Json<DeliverRequest>,
) -> Result<Json<ApiResponse<DeliveryReceipt>>, AppError> {
    let response = controller(&state).deliver(id, request, &ctx).await?;
    Ok(Json(response))
}

async fn preview_return(
    State(state): State<AppState>,
    ctx: OperatorContext,
    Path(id): Path<Uuid>,
    Json(request): Json<ReturnRequest>,
) -> Result<Json<ApiResponse<SettlementResponse>>, AppError> {
    let response = controller(&state).preview_return(id, request, &ctx).await?;
    Ok(Json(response))
}

async fn return_vehicle(
    State(state): State<AppState>,
    ctx: OperatorContext,
    Path(id): Path<Uuid>,
    Json(request): Json<ReturnRequest>,
) -> Result<Json<ApiResponse<SettlementResponse>>, AppError> {
    let response = controller(&state).return_vehicle(id, request, &ctx).await?;
    Ok(Json(response))
}

async fn cancel_reservation(
    State(state): State<AppState>,
    ctx: OperatorContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReservationResponse>>, AppError> {
    let response = controller(&state).cancel(id, &ctx).await?;
    Ok(Json(response))
}
