//! Ledger en memoria
//!
//! Un único mutex sobre todas las tablas, así cada unidad de trabajo es
//! serializable. Lo usan `STORAGE_BACKEND=memory` y los tests de integración.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{Changeset, Guard, Ledger, LockScope, LockedView};
use crate::models::{Client, Reservation, ReservationStatus, Vehicle};
use crate::utils::errors::{conflict_error, not_found_error, AppError, AppResult};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct Tables {
    vehicles: BTreeMap<Uuid, Vehicle>,
    clients: BTreeMap<Uuid, Client>,
    reservations: BTreeMap<Uuid, Reservation>,
}

impl Tables {
    fn view(&self, scope: &LockScope) -> LockedView {
        let reservation = scope
            .reservation
            .and_then(|id| self.reservations.get(&id).cloned());

        let mut vehicle_ids = scope.vehicles.clone();
        if let Some(r) = &reservation {
            vehicle_ids.push(r.vehicle_id);
        }
        vehicle_ids.sort();
        vehicle_ids.dedup();

        let vehicles = vehicle_ids
            .iter()
            .filter_map(|id| self.vehicles.get(id).cloned())
            .collect();
        let bookings = self
            .reservations
            .values()
            .filter(|r| r.is_active() && vehicle_ids.contains(&r.vehicle_id))
            .cloned()
            .collect();

        let client = scope.client.and_then(|id| self.clients.get(&id).cloned());
        let client_bookings = scope
            .client
            .map(|id| {
                self.reservations
                    .values()
                    .filter(|r| r.is_active() && r.client_id == id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        LockedView {
            reservation,
            vehicles,
            client,
            bookings,
            client_bookings,
        }
    }

    /// Comprueba cada escritura antes, un changeset inválido deja las tablas intactas
    fn apply(&mut self, changes: &Changeset) -> AppResult<()> {
        for v in &changes.vehicles {
            if !self.vehicles.contains_key(&v.id) {
                return Err(not_found_error("vehicle", v.id));
            }
        }
        for c in &changes.clients {
            if !self.clients.contains_key(&c.id) {
                return Err(not_found_error("client", c.id));
            }
        }
        for r in &changes.reservations {
            if !self.vehicles.contains_key(&r.vehicle_id) {
                return Err(not_found_error("vehicle", r.vehicle_id));
            }
            if !self.clients.contains_key(&r.client_id) {
                return Err(not_found_error("client", r.client_id));
            }
        }

        for v in &changes.vehicles {
            self.vehicles.insert(v.id, v.clone());
        }
        for c in &changes.clients {
            self.clients.insert(c.id, c.clone());
        }
        for r in &changes.reservations {
            self.reservations.insert(r.id, r.clone());
        }
        Ok(())
    }
}

/// Handle clonable; los clones comparten las mismas tablas
#[derive(Debug, Clone)]
pub struct InMemoryLedger {
    tables: Arc<Mutex<Tables>>,
    lock_timeout: Duration,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            lock_timeout,
        }
    }

    async fn lock(&self) -> AppResult<MutexGuard<'_, Tables>> {
        tokio::time::timeout(self.lock_timeout, self.tables.lock())
            .await
            .map_err(|_| AppError::LockTimeout {
                timeout_ms: self.lock_timeout.as_millis() as u64,
            })
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn with_lock(&self, scope: LockScope, guard: Guard) -> AppResult<Changeset> {
        let mut tables = self.lock().await?;
        let view = tables.view(&scope);

        let mut changes = guard(&view)?;

        let now = Utc::now();
        for r in &mut changes.reservations {
            r.updated_at = now;
        }
        for v in &mut changes.vehicles {
            v.updated_at = now;
        }
        for c in &mut changes.clients {
            c.updated_at = now;
        }

        tables.apply(&changes)?;
        Ok(changes)
    }

    async fn insert_vehicle(&self, vehicle: &Vehicle) -> AppResult<()> {
        let mut tables = self.lock().await?;
        if tables.vehicles.values().any(|v| v.plate == vehicle.plate) {
            return Err(conflict_error("Vehicle", "plate", &vehicle.plate));
        }
        tables.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(())
    }

    async fn get_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        Ok(self.lock().await?.vehicles.get(&id).cloned())
    }

    async fn list_vehicles(&self) -> AppResult<Vec<Vehicle>> {
        let tables = self.lock().await?;
        let mut vehicles: Vec<Vehicle> = tables.vehicles.values().cloned().collect();
        vehicles.sort_by(|a, b| a.model.cmp(&b.model).then_with(|| a.plate.cmp(&b.plate)));
        Ok(vehicles)
    }

    async fn insert_client(&self, client: &Client) -> AppResult<()> {
        let mut tables = self.lock().await?;
        if tables.clients.values().any(|c| c.tax_id == client.tax_id) {
            return Err(conflict_error("Client", "tax_id", &client.tax_id));
        }
        tables.clients.insert(client.id, client.clone());
        Ok(())
    }

    async fn get_client(&self, id: Uuid) -> AppResult<Option<Client>> {
        Ok(self.lock().await?.clients.get(&id).cloned())
    }

    async fn list_clients(&self) -> AppResult<Vec<Client>> {
        let tables = self.lock().await?;
        let mut clients: Vec<Client> = tables.clients.values().cloned().collect();
        clients.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(clients)
    }

    async fn get_reservation(&self, id: Uuid) -> AppResult<Option<Reservation>> {
        Ok(self.lock().await?.reservations.get(&id).cloned())
    }

    async fn list_reservations(&self, status: Option<ReservationStatus>) -> AppResult<Vec<Reservation>> {
        let tables = self.lock().await?;
        let mut reservations: Vec<Reservation> = tables
            .reservations
            .values()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        reservations.sort_by(|a, b| b.start_date.cmp(&a.start_date).then_with(|| a.id.cmp(&b.id)));
        Ok(reservations)
    }

    async fn active_bookings(&self) -> AppResult<Vec<Reservation>> {
        let tables = self.lock().await?;
        Ok(tables
            .reservations
            .values()
            .filter(|r| r.is_active())
            .cloned()
            .collect())
    }

    async fn ping(&self) -> AppResult<()> {
        self.lock().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewClient, NewVehicle, VehicleStatus};
    use crate::utils::errors::validation_error;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn new_vehicle(plate: &str) -> Vehicle {
        NewVehicle {
            model: "Argo".to_string(),
            plate: plate.to_string(),
            color: None,
            year: None,
            daily_rate: Decimal::from(120),
            distance_rate: Decimal::ONE,
            odometer: 500,
            next_service_odometer: 10_000,
        }
        .into_vehicle(Uuid::new_v4(), Utc::now())
    }

    fn new_client(tax_id: &str) -> Client {
        NewClient {
            name: "Ana".to_string(),
            tax_id: tax_id.to_string(),
            license_number: "123".to_string(),
            license_expiry: NaiveDate::from_ymd_opt(2030, 1, 1).expect("valid date"),
            phone: "555".to_string(),
            address: None,
            notes: None,
        }
        .into_client(Uuid::new_v4(), Utc::now())
    }

    #[tokio::test]
    async fn test_unique_plate_and_tax_id() {
        let ledger = InMemoryLedger::new();
        ledger.insert_vehicle(&new_vehicle("ABC1234")).await.unwrap();
        let dup = ledger.insert_vehicle(&new_vehicle("ABC1234")).await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));

        ledger.insert_client(&new_client("111")).await.unwrap();
        let dup = ledger.insert_client(&new_client("111")).await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_guard_error_rolls_back() {
        let ledger = InMemoryLedger::new();
        let vehicle = new_vehicle("ABC1234");
        ledger.insert_vehicle(&vehicle).await.unwrap();

        let id = vehicle.id;
        let result = ledger
            .with_lock(
                LockScope::vehicle(id),
                Box::new(move |view: &LockedView| -> AppResult<Changeset> {
                    let _ = view.vehicle(id)?;
                    Err(validation_error("odometer", "rejected"))
                }),
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let stored = ledger.get_vehicle(id).await.unwrap().unwrap();
        assert_eq!(stored, vehicle);
    }

    #[tokio::test]
    async fn test_changeset_is_applied() {
        let ledger = InMemoryLedger::new();
        let vehicle = new_vehicle("ABC1234");
        ledger.insert_vehicle(&vehicle).await.unwrap();

        let id = vehicle.id;
        ledger
            .with_lock(
                LockScope::vehicle(id),
                Box::new(move |view: &LockedView| -> AppResult<Changeset> {
                    let mut v = view.vehicle(id)?.clone();
                    v.status = VehicleStatus::Unavailable;
                    Ok(Changeset::default().vehicle(v))
                }),
            )
            .await
            .unwrap();

        let stored = ledger.get_vehicle(id).await.unwrap().unwrap();
        assert_eq!(stored.status, VehicleStatus::Unavailable);
    }

    #[tokio::test]
    async fn test_missing_scope_record_is_not_found() {
        let ledger = InMemoryLedger::new();
        let id = Uuid::new_v4();
        let result = ledger
            .with_lock(
                LockScope::reservation(id),
                Box::new(move |view: &LockedView| -> AppResult<Changeset> {
                    view.reservation(id)?;
                    Ok(Changeset::default())
                }),
            )
            .await;
        assert!(matches!(result, Err(AppError::NotFound { entity: "reservation", .. })));
    }

    #[tokio::test]
    async fn test_lock_wait_is_bounded() {
        let ledger = InMemoryLedger::with_lock_timeout(Duration::from_millis(20));
        let held = ledger.tables.lock().await;
        let result = ledger.list_vehicles().await;
        assert!(matches!(result, Err(AppError::LockTimeout { timeout_ms: 20 })));
        drop(held);
        assert!(ledger.list_vehicles().await.is_ok());
    }
}
