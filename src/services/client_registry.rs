//! Guardas del registro de clientes

use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{Client, ClientStatus};
use crate::repositories::{Changeset, LockedView};
use crate::utils::errors::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
pub struct ClientUpdate {
    pub name: Option<String>,
    pub license_number: Option<String>,
    pub license_expiry: Option<NaiveDate>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

fn not_removed(client: &Client) -> AppResult<()> {
    if client.status == ClientStatus::Removed {
        return Err(AppError::state_conflict("client", client.id, "client has been removed"));
    }
    Ok(())
}

pub fn update(view: &LockedView, id: Uuid, patch: &ClientUpdate) -> AppResult<Changeset> {
    let current = view.client(id)?;
    not_removed(current)?;

    let mut client = current.clone();
    if let Some(name) = &patch.name {
        client.name = name.trim().to_string();
    }
    if let Some(number) = &patch.license_number {
        client.license_number = number.trim().to_string();
    }
    if let Some(expiry) = patch.license_expiry {
        client.license_expiry = expiry;
    }
    if let Some(phone) = &patch.phone {
        client.phone = phone.trim().to_string();
    }
    if let Some(address) = &patch.address {
        client.address = Some(address.clone());
    }
    if let Some(notes) = &patch.notes {
        client.notes = Some(notes.clone());
    }

    Ok(Changeset::default().client(client))
}

/// Baja lógica, rechazada mientras el cliente tenga una reserva Reserved o Delivered
pub fn remove(view: &LockedView, id: Uuid) -> AppResult<Changeset> {
    let current = view.client(id)?;
    not_removed(current)?;

    let outstanding = view.client_bookings.iter().filter(|r| r.is_active()).count();
    if outstanding > 0 {
        return Err(AppError::ReferentialConflict {
            entity: "client",
            id,
            outstanding,
        });
    }

    let mut client = current.clone();
    client.status = ClientStatus::Removed;
    Ok(Changeset::default().client(client))
}
