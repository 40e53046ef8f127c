//! Middleware CORS
//!
//! Cualquier origen si `CORS_ORIGINS` no está definida, una lista explícita en caso contrario.

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::CorsLayer;

use super::operator::OPERATOR_HEADER;

/// Capa permisiva para desarrollo local
pub fn cors_middleware() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Capa restringida a los orígenes configurados
pub fn cors_middleware_with_origins(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "⚠️ Origen CORS inválido ignorado");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            HeaderName::from_static("content-type"),
            HeaderName::from_static("accept"),
            HeaderName::from_static("origin"),
            HeaderName::from_static(OPERATOR_HEADER),
        ])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Elegir la capa según la lista de orígenes configurada
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        cors_middleware()
    } else {
        cors_middleware_with_origins(origins)
    }
}
