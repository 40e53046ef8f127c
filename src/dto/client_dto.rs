use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Client, ClientStatus, NewClient};
use crate::services::client_registry::ClientUpdate;

// Petición para registrar un cliente
#[derive(Debug, Deserialize, Validate)]
pub struct CreateClientRequest {
    #[validate(length(min = 2, max = 150), custom = "crate::utils::validation::validate_not_blank")]
    pub name: String,
    #[validate(length(min = 5, max = 20))]
    pub tax_id: String,
    #[validate(length(min = 5, max = 20))]
    pub license_number: String,
    pub license_expiry: NaiveDate,
    #[validate(length(min = 8, max = 20))]
    pub phone: String,
    #[validate(length(max = 250))]
    pub address: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl From<CreateClientRequest> for NewClient {
    fn from(request: CreateClientRequest) -> Self {
        NewClient {
            name: request.name.trim().to_string(),
            tax_id: request.tax_id.trim().to_string(),
            license_number: request.license_number.trim().to_string(),
            license_expiry: request.license_expiry,
            phone: request.phone.trim().to_string(),
            address: request.address,
            notes: request.notes,
        }
    }
}

// Petición para actualizar un cliente; el documento fiscal identifica a la persona y no cambia
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateClientRequest {
    #[validate(length(min = 2, max = 150))]
    pub name: Option<String>,
    #[validate(length(min = 5, max = 20))]
    pub license_number: Option<String>,
    pub license_expiry: Option<NaiveDate>,
    #[validate(length(min = 8, max = 20))]
    pub phone: Option<String>,
    #[validate(length(max = 250))]
    pub address: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl From<UpdateClientRequest> for ClientUpdate {
    fn from(request: UpdateClientRequest) -> Self {
        ClientUpdate {
            name: request.name,
            license_number: request.license_number,
            license_expiry: request.license_expiry,
            phone: request.phone,
            address: request.address,
            notes: request.notes,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ClientListQuery {
    #[serde(default)]
    pub include_removed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClientResponse {
    pub id: Uuid,
    pub name: String,
    pub tax_id: String,
    pub license_number: String,
    pub license_expiry: NaiveDate,
    pub phone: String,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub status: ClientStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Client> for ClientResponse {
    fn from(client: Client) -> Self {
        Self {
            id: client.id,
            name: client.name,
            tax_id: client.tax_id,
            license_number: client.license_number,
            license_expiry: client.license_expiry,
            phone: client.phone,
            address: client.address,
            notes: client.notes,
            status: client.status,
            created_at: client.created_at,
            updated_at: client.updated_at,
        }
    }
}
