//! Núcleo de reservas de alquiler de flota
//!
//! Vehículos, clientes y las reservas que los vinculan: disponibilidad, el ciclo
//! Reserved → Delivered → Returned y la liquidación de la devolución, servidos
//! como API JSON sobre un ledger transaccional.

pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::middleware::cors_layer;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Construir el router completo sobre `state`
pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/health", get(health))
        .nest("/api/availability", routes::availability_routes::create_availability_router())
        .nest("/api/reservations", routes::reservation_routes::create_reservation_router())
        .nest("/api/vehicles", routes::vehicle_routes::create_vehicle_router())
        .nest("/api/clients", routes::client_routes::create_client_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    state.ledger.ping().await?;
    Ok(Json(json!({
        "status": "ok",
        "environment": state.config.environment,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}
