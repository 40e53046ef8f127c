use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::dto::client_dto::{ClientListQuery, ClientResponse, CreateClientRequest, UpdateClientRequest};
use crate::dto::ApiResponse;
use crate::middleware::OperatorContext;
use crate::models::NewClient;
use crate::repositories::{Ledger, LockScope, LockedView};
use crate::services::client_registry::{self, ClientUpdate};
use crate::utils::errors::{not_found_error, AppError, AppResult};

pub struct ClientController {
    ledger: Arc<dyn Ledger>,
}

impl ClientController {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    pub async fn create(
        &self,
        request: CreateClientRequest,
        ctx: &OperatorContext,
    ) -> AppResult<ApiResponse<ClientResponse>> {
        request.validate().map_err(AppError::Validation)?;

        let client = NewClient::from(request).into_client(Uuid::new_v4(), Utc::now());
        self.ledger.insert_client(&client).await?;

        tracing::info!(client_id = %client.id, operator = %ctx.operator, "👤 Cliente registrado");

        Ok(ApiResponse::success_with_message(
            ClientResponse::from(client),
            "Client registered",
        ))
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<ClientResponse> {
        self.ledger
            .get_client(id)
            .await?
            .map(ClientResponse::from)
            .ok_or_else(|| not_found_error("client", id))
    }

    pub async fn list(&self, query: &ClientListQuery) -> AppResult<Vec<ClientResponse>> {
        let clients = self.ledger.list_clients().await?;
        Ok(clients
            .into_iter()
            .filter(|c| query.include_removed || c.is_active())
            .map(ClientResponse::from)
            .collect())
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateClientRequest,
        ctx: &OperatorContext,
    ) -> AppResult<ApiResponse<ClientResponse>> {
        request.validate().map_err(AppError::Validation)?;
        let patch = ClientUpdate::from(request);

        let changes = self
            .ledger
            .with_lock(
                LockScope::client(id),
                Box::new(move |view: &LockedView| client_registry::update(view, id, &patch)),
            )
            .await?;
        let client = changes.written_client(id)?.clone();

        tracing::info!(client_id = %id, operator = %ctx.operator, "✏️ Cliente actualizado");

        Ok(ApiResponse::success_with_message(ClientResponse::from(client), "Client updated"))
    }

    pub async fn remove(&self, id: Uuid, ctx: &OperatorContext) -> AppResult<ApiResponse<ClientResponse>> {
        let changes = self
            .ledger
            .with_lock(
                LockScope::client(id),
                Box::new(move |view: &LockedView| client_registry::remove(view, id)),
            )
            .await?;
        let client = changes.written_client(id)?.clone();

        tracing::info!(client_id = %id, operator = %ctx.operator, "🗑️ Cliente dado de baja");

        Ok(ApiResponse::success_with_message(ClientResponse::from(client), "Client removed"))
    }
}
