use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::controllers::vehicle_controller::VehicleController;
use crate::dto::reservation_dto::AvailabilityQuery;
use crate::dto::vehicle_dto::VehicleSummary;
use crate::dto::ApiResponse;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_availability_router() -> Router<AppState> {
    Router::new().route("/", get(find_available))
}

async fn find_available(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<ApiResponse<Vec<VehicleSummary>>>, AppError> {
    let controller = VehicleController::new(state.ledger.clone());
    let response = controller.available(&query).await?;
    Ok(Json(ApiResponse::success(response)))
}
