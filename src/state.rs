//! Estado compartido de la aplicación
//!
//! Se entrega a cada handler de axum a través del router.

use std::sync::Arc;

use crate::config::EnvironmentConfig;
use crate::repositories::Ledger;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn Ledger>,
    pub config: EnvironmentConfig,
}

impl AppState {
    pub fn new(ledger: Arc<dyn Ledger>, config: EnvironmentConfig) -> Self {
        Self { ledger, config }
    }
}
