use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::client_controller::ClientController;
use crate::dto::client_dto::{ClientListQuery, ClientResponse, CreateClientRequest, UpdateClientRequest};
use crate::dto::ApiResponse;
use crate::middleware::OperatorContext;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_client_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_client).get(list_clients))
        .route("/:id", get(get_client).put(update_client))
        .route("/:id/remove", post(remove_client))
}

async fn create_client(
    State(state): State<AppState>,
    ctx: OperatorContext,
    Json(request): Json<CreateClientRequest>,
) -> Result<Json<ApiResponse<ClientResponse>>, AppError> {
    let controller = ClientController::new(state.ledger.clone());
    let response = controller.create(request, &ctx).await?;
    Ok(Json(response))
}

async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ClientResponse>>, AppError> {
    let controller = ClientController::new(state.ledger.clone());
    let response = controller.get_by_id(id).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn list_clients(
    State(state): State<AppState>,
    Query(query): Query<ClientListQuery>,
) -> Result<Json<ApiResponse<Vec<ClientResponse>>>, AppError> {
    let controller = ClientController::new(state.ledger.clone());
    let response = controller.list(&query).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn update_client(
    State(state): State<AppState>,
    ctx: OperatorContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateClientRequest>,
) -> Result<Json<ApiResponse<ClientResponse>>, AppError> {
    let controller = ClientController::new(state.ledger.clone());
    let response = controller.update(id, request, &ctx).await?;
    Ok(Json(response))
}

async fn remove_client(
    State(state): State<AppState>,
    ctx: OperatorContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ClientResponse>>, AppError> {
    let controller = ClientController::new(state.ledger.clone());
    let response = controller.remove(id, &ctx).await?;
    Ok(Json(response))
}
