//! Contexto del operador
//!
//! Quién actúa y qué día es, tomados de cada petición en lugar de un estado
//! de sesión global del proceso.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::{Local, NaiveDate};
use std::convert::Infallible;

pub const OPERATOR_HEADER: &str = "x-operator";
const ANONYMOUS: &str = "anonymous";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorContext {
    pub operator: String,
    pub today: NaiveDate,
}

impl OperatorContext {
    pub fn new(operator: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            operator: operator.into(),
            today,
        }
    }

    fn from_parts(parts: &Parts) -> Self {
        let operator = parts
            .headers
            .get(OPERATOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(ANONYMOUS);

        Self::new(operator, Local::now().date_naive())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for OperatorContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}
