//! Modelo de cliente
//!
//! Arrendatarios. `Removed` es terminal para nuevas reservas, la fila se conserva como histórico.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado del cliente - mapea al ENUM `client_status`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "client_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    Active,
    Removed,
}

/// Fila de cliente - mapea a la tabla `clients`
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Client {
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

impl Client {
    pub fn is_active(&self) -> bool {
        self.status == ClientStatus::Active
    }

    /// La licencia es válida hasta su día de vencimiento inclusive
    pub fn license_valid_on(&self, day: NaiveDate) -> bool {
        self.license_expiry >= day
    }
}

/// Datos necesarios para registrar un cliente
#[derive(Debug, Clone)]
pub struct NewClient {
    pub name: String,
    pub tax_id: String,
    pub license_number: String,
    pub license_expiry: NaiveDate,
    pub phone: String,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl NewClient {
    pub fn into_client(self, id: Uuid, now: DateTime<Utc>) -> Client {
        Client {
            id,
            name: self.name,
            tax_id: self.tax_id,
            license_number: self.license_number,
            license_expiry: self.license_expiry,
            phone: self.phone,
            address: self.address,
            notes: self.notes,
            status: ClientStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}
