use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::vehicle_controller::VehicleController;
use crate::dto::vehicle_dto::{
    CreateVehicleRequest, SetVehicleStatusRequest, UpdateVehicleRequest, VehicleListQuery, VehicleResponse,
};
use crate::dto::ApiResponse;
use crate::middleware::OperatorContext;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_vehicle_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_vehicle).get(list_vehicles))
        .route("/:id", get(get_vehicle).put(update_vehicle))
        .route("/:id/status", put(set_vehicle_status))
        .route("/:id/retire", post(retire_vehicle))
}

async fn create_vehicle(
    State(state): State<AppState>,
    ctx: OperatorContext,
    Json(request): Json<CreateVehicleRequest>,
) -> Result<Json<ApiResponse<VehicleResponse>>, AppError> {
    let controller = VehicleController::new(state.ledger.clone());
    let response = controller.create(request, &ctx).await?;
    Ok(Json(response))
}

async fn get_vehicle(
    State(state): State<AppState>,
    ctx: OperatorContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<VehicleResponse>>, AppError> {
    let controller = VehicleController::new(state.ledger.clone());
    let response = controller.get_by_id(id, &ctx).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn list_vehicles(
    State(state): State<AppState>,
    ctx: OperatorContext,
    Query(query): Query<VehicleListQuery>,
) -> Result<Json<ApiResponse<Vec<VehicleResponse>>>, AppError> {
    let controller = VehicleController::new(state.ledger.clone());
    let response = controller.list(&query, &ctx).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn update_vehicle(
    State(state): State<AppState>,
    ctx: OperatorContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateVehicleRequest>,
) -> Result<Json<ApiResponse<VehicleResponse>>, AppError> {
    let controller = VehicleController::new(state.ledger.clone());
    let response = controller.update(id, request, &ctx).await?;
    Ok(Json(response))
}

async fn set_vehicle_status(
    State(state): State<AppState>,
    ctx: OperatorContext,
    Path(id): Path<Uuid>,
    Json(request): Json<SetVehicleStatusRequest>,
) -> Result<Json<ApiResponse<VehicleResponse>>, AppError> {
    let controller = VehicleController::new(state.ledger.clone());
    let response = controller.set_status(id, request.status, &ctx).await?;
    Ok(Json(response))
}

async fn retire_vehicle(
    State(state): State<AppState>,
    ctx: OperatorContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<VehicleResponse>>, AppError> {
    let controller = VehicleController::new(state.ledger.clone());
    let response = controller.retire(id, &ctx).await?;
    Ok(Json(response))
}
