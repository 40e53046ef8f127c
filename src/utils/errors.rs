//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del núcleo de alquiler y su
//! conversión a respuestas HTTP con contexto suficiente para mostrarlas tal cual.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// El bloqueo sobre registros del ledger no se concedió a tiempo
    #[error("Storage error: lock wait timed out after {timeout_ms} ms")]
    LockTimeout { timeout_ms: u64 },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("State conflict on {entity} {id}: {guard}")]
    StateConflict {
        entity: &'static str,
        id: Uuid,
        guard: String,
    },

    #[error("Referential conflict on {entity} {id}: {outstanding} outstanding reservation(s)")]
    ReferentialConflict {
        entity: &'static str,
        id: Uuid,
        outstanding: usize,
    },

    #[error("{entity} with id '{id}' not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn state_conflict(entity: &'static str, id: Uuid, guard: impl Into<String>) -> Self {
        AppError::StateConflict {
            entity,
            id,
            guard: guard.into(),
        }
    }

    /// Código HTTP para este error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Storage(sqlx::Error::PoolTimedOut) | AppError::LockTimeout { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::StateConflict { .. }
            | AppError::ReferentialConflict { .. }
            | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }

    /// Código estable legible por máquina
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Storage(_) | AppError::LockTimeout { .. } => "STORAGE_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::StateConflict { .. } => "STATE_CONFLICT",
            AppError::ReferentialConflict { .. } => "REFERENTIAL_CONFLICT",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Cuerpo de error devuelto por la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    code: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        let error_response = match &self {
            AppError::Storage(e) => {
                tracing::error!(error = %e, "❌ Fallo de almacenamiento");
                ErrorResponse {
                    error: "Storage Error".to_string(),
                    message: "An error occurred while accessing the ledger".to_string(),
                    details: Some(json!({ "storage_error": e.to_string() })),
                    code,
                }
            }

            AppError::LockTimeout { timeout_ms } => {
                tracing::warn!(timeout_ms, "⏳ Espera de bloqueo del ledger agotada");
                ErrorResponse {
                    error: "Storage Error".to_string(),
                    message: "The records are busy, try again".to_string(),
                    details: Some(json!({ "lock_timeout_ms": timeout_ms })),
                    code,
                }
            }

            AppError::Validation(e) => {
                tracing::debug!(error = %e, "Validación fallida");
                ErrorResponse {
                    error: "Validation Error".to_string(),
                    message: "The provided data is invalid".to_string(),
                    details: Some(json!(e)),
                    code,
                }
            }

            AppError::StateConflict { entity, id, guard } => {
                tracing::info!(%entity, %id, %guard, "Conflicto de estado");
                ErrorResponse {
                    error: "State Conflict".to_string(),
                    message: guard.clone(),
                    details: Some(json!({ "entity": entity, "id": id, "guard": guard })),
                    code,
                }
            }

            AppError::ReferentialConflict {
                entity,
                id,
                outstanding,
            } => {
                tracing::info!(%entity, %id, outstanding, "Conflicto referencial");
                ErrorResponse {
                    error: "Referential Conflict".to_string(),
                    message: self.to_string(),
                    details: Some(json!({
                        "entity": entity,
                        "id": id,
                        "outstanding_reservations": outstanding,
                    })),
                    code,
                }
            }

            AppError::NotFound { entity, id } => ErrorResponse {
                error: "Not Found".to_string(),
                message: self.to_string(),
                details: Some(json!({ "entity": entity, "id": id })),
                code,
            },

            AppError::Conflict(msg) => ErrorResponse {
                error: "Conflict".to_string(),
                message: msg.clone(),
                details: None,
                code,
            },

            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "❌ Error interno");
                ErrorResponse {
                    error: "Internal Server Error".to_string(),
                    message: "An unexpected error occurred".to_string(),
                    details: Some(json!({ "internal_error": msg })),
                    code,
                }
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Helper para crear un error de validación de un solo campo
pub fn validation_error(field: &'static str, message: &'static str) -> AppError {
    use validator::ValidationError;

    let mut error = ValidationError::new("custom");
    error.message = Some(message.into());
    error.add_param("field".into(), &field);

    let mut errors = validator::ValidationErrors::new();
    errors.add(field, error);

    AppError::Validation(errors)
}

/// Helper para registros inexistentes
pub fn not_found_error(entity: &'static str, id: Uuid) -> AppError {
    AppError::NotFound { entity, id }
}

/// Helper para claves únicas duplicadas
pub fn conflict_error(resource: &str, field: &str, value: &str) -> AppError {
    AppError::Conflict(format!("{} with {} '{}' already exists", resource, field, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let id = Uuid::new_v4();
        assert_eq!(
            AppError::state_conflict("reservation", id, "x").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::ReferentialConflict {
                entity: "client",
                id,
                outstanding: 2
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(not_found_error("vehicle", id).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            validation_error("end_date", "end date before start date").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Storage(sqlx::Error::PoolTimedOut).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        let timeout = AppError::LockTimeout { timeout_ms: 250 };
        assert_eq!(timeout.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(timeout.code(), "STORAGE_ERROR");
        assert_eq!(
            AppError::Storage(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_error_names_field() {
        match validation_error("odometer_in", "must not be negative") {
            AppError::Validation(errors) => {
                assert!(errors.field_errors().contains_key("odometer_in"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_state_conflict_message_carries_guard() {
        let id = Uuid::new_v4();
        let err = AppError::state_conflict("reservation", id, "cannot cancel a delivered reservation");
        let msg = err.to_string();
        assert!(msg.contains(&id.to_string()));
        assert!(msg.contains("cannot cancel a delivered reservation"));
    }
}
