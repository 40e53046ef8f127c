//! Ledger PostgreSQL
//!
//! Cada unidad de trabajo es una transacción. Las filas se bloquean con
//! `SELECT ... FOR UPDATE` en un orden fijo (reserva, vehículos por id, cliente)
//! y la espera de bloqueo está acotada por `SET LOCAL lock_timeout`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{Changeset, Guard, Ledger, LockScope, LockedView};
use crate::models::{Client, Reservation, ReservationStatus, Vehicle};
use crate::utils::errors::{conflict_error, AppError, AppResult};

/// SQLSTATE que se lanza cuando vence `lock_timeout`
const LOCK_NOT_AVAILABLE: &str = "55P03";

const ACTIVE_STATUSES: &str = "('reserved', 'delivered')";

#[derive(Debug, Clone)]
pub struct PgLedger {
    pool: PgPool,
    lock_timeout_ms: u64,
}

impl PgLedger {
    pub fn new(pool: PgPool, lock_timeout_ms: u64) -> Self {
        Self {
            pool,
            lock_timeout_ms,
        }
    }

    async fn lock_rows(&self, tx: &mut Transaction<'_, Postgres>, scope: &LockScope) -> AppResult<LockedView> {
        let reservation = match scope.reservation {
            Some(id) => {
                sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1 FOR UPDATE")
                    .bind(id)
                    .fetch_optional(&mut **tx)
                    .await?
            }
            None => None,
        };

        let mut vehicle_ids = scope.vehicles.clone();
        if let Some(r) = &reservation {
            vehicle_ids.push(r.vehicle_id);
        }
        vehicle_ids.sort();
        vehicle_ids.dedup();

        let vehicles = if vehicle_ids.is_empty() {
            Vec::new()
        } else {
            sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = ANY($1) ORDER BY id FOR UPDATE")
                .bind(&vehicle_ids)
                .fetch_all(&mut **tx)
                .await?
        };

        let client = match scope.client {
            Some(id) => {
                sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1 FOR UPDATE")
                    .bind(id)
                    .fetch_optional(&mut **tx)
                    .await?
            }
            None => None,
        };

        // Las reservas de un vehículo solo cambian con la fila de ese vehículo bloqueada
        let bookings = if vehicle_ids.is_empty() {
            Vec::new()
        } else {
            sqlx::query_as::<_, Reservation>(&format!(
                "SELECT * FROM reservations WHERE vehicle_id = ANY($1) AND status IN {} ORDER BY start_date",
                ACTIVE_STATUSES
            ))
            .bind(&vehicle_ids)
            .fetch_all(&mut **tx)
            .await?
        };

        let client_bookings = match scope.client {
            Some(id) => {
                sqlx::query_as::<_, Reservation>(&format!(
                    "SELECT * FROM reservations WHERE client_id = $1 AND status IN {} ORDER BY start_date",
                    ACTIVE_STATUSES
                ))
                .bind(id)
                .fetch_all(&mut **tx)
                .await?
            }
            None => Vec::new(),
        };

        Ok(LockedView {
            reservation,
            vehicles,
            client,
            bookings,
            client_bookings,
        })
    }

    async fn apply(tx: &mut Transaction<'_, Postgres>, changes: &Changeset) -> AppResult<()> {
        for r in &changes.reservations {
            sqlx::query(
                r#"
                INSERT INTO reservations (
                    id, vehicle_id, client_id, start_date, end_date, status,
                    odometer_out, odometer_in, franchise_km, advance_payment,
                    wash_cost, fines, damages, other_charges, returned_on,
                    settlement, created_by, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
                ON CONFLICT (id) DO UPDATE SET
                    vehicle_id = EXCLUDED.vehicle_id,
                    start_date = EXCLUDED.start_date,
                    end_date = EXCLUDED.end_date,
                    status = EXCLUDED.status,
                    odometer_out = EXCLUDED.odometer_out,
                    odometer_in = EXCLUDED.odometer_in,
                    franchise_km = EXCLUDED.franchise_km,
                    advance_payment = EXCLUDED.advance_payment,
                    wash_cost = EXCLUDED.wash_cost,
                    fines = EXCLUDED.fines,
                    damages = EXCLUDED.damages,
                    other_charges = EXCLUDED.other_charges,
                    returned_on = EXCLUDED.returned_on,
                    settlement = EXCLUDED.settlement,
                    updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(r.id)
            .bind(r.vehicle_id)
            .bind(r.client_id)
            .bind(r.start_date)
            .bind(r.end_date)
            .bind(r.status)
            .bind(r.odometer_out)
            .bind(r.odometer_in)
            .bind(r.franchise_km)
            .bind(r.advance_payment)
            .bind(r.wash_cost)
            .bind(r.fines)
            .bind(r.damages)
            .bind(r.other_charges)
            .bind(r.returned_on)
            .bind(r.settlement.clone())
            .bind(&r.created_by)
            .bind(r.created_at)
            .bind(r.updated_at)
            .execute(&mut **tx)
            .await?;
        }

        for v in &changes.vehicles {
            sqlx::query(
                r#"
                UPDATE vehicles SET
                    model = $2, color = $3, year = $4, daily_rate = $5, distance_rate = $6,
                    odometer = $7, next_service_odometer = $8, status = $9, updated_at = $10
                WHERE id = $1
                "#,
            )
            .bind(v.id)
            .bind(&v.model)
            .bind(&v.color)
            .bind(v.year)
            .bind(v.daily_rate)
            .bind(v.distance_rate)
            .bind(v.odometer)
            .bind(v.next_service_odometer)
            .bind(v.status)
            .bind(v.updated_at)
            .execute(&mut **tx)
            .await?;
        }

        for c in &changes.clients {
            sqlx::query(
                r#"
                UPDATE clients SET
                    name = $2, license_number = $3, license_expiry = $4, phone = $5,
                    address = $6, notes = $7, status = $8, updated_at = $9
                WHERE id = $1
                "#,
            )
            .bind(c.id)
            .bind(&c.name)
            .bind(&c.license_number)
            .bind(c.license_expiry)
            .bind(&c.phone)
            .bind(&c.address)
            .bind(&c.notes)
            .bind(c.status)
            .bind(c.updated_at)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }
}

fn map_lock_error(err: AppError, timeout_ms: u64) -> AppError {
    match err {
        AppError::Storage(sqlx::Error::Database(db))
            if db.code().as_deref() == Some(LOCK_NOT_AVAILABLE) =>
        {
            AppError::LockTimeout { timeout_ms }
        }
        other => other,
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl Ledger for PgLedger {
    async fn with_lock(&self, scope: LockScope, guard: Guard) -> AppResult<Changeset> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout_ms))
            .execute(&mut *tx)
            .await?;

        let view = self
            .lock_rows(&mut tx, &scope)
            .await
            .map_err(|e| map_lock_error(e, self.lock_timeout_ms))?;

        let mut changes = match guard(&view) {
            Ok(changes) => changes,
            Err(e) => {
                tx.rollback().await?;
                return Err(e);
            }
        };

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

        Self::apply(&mut tx, &changes)
            .await
            .map_err(|e| map_lock_error(e, self.lock_timeout_ms))?;
        tx.commit().await?;

        Ok(changes)
    }

    async fn insert_vehicle(&self, vehicle: &Vehicle) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO vehicles (id, model, plate, color, year, daily_rate, distance_rate,
                                  odometer, next_service_odometer, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(vehicle.id)
        .bind(&vehicle.model)
        .bind(&vehicle.plate)
        .bind(&vehicle.color)
        .bind(vehicle.year)
        .bind(vehicle.daily_rate)
        .bind(vehicle.distance_rate)
        .bind(vehicle.odometer)
        .bind(vehicle.next_service_odometer)
        .bind(vehicle.status)
        .bind(vehicle.created_at)
        .bind(vehicle.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                conflict_error("Vehicle", "plate", &vehicle.plate)
            } else {
                AppError::Storage(e)
            }
        })?;

        Ok(())
    }

    async fn get_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(vehicle)
    }

    async fn list_vehicles(&self) -> AppResult<Vec<Vehicle>> {
        let vehicles = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles ORDER BY model, plate")
            .fetch_all(&self.pool)
            .await?;
        Ok(vehicles)
    }

    async fn insert_client(&self, client: &Client) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO clients (id, name, tax_id, license_number, license_expiry, phone,
                                 address, notes, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(client.id)
        .bind(&client.name)
        .bind(&client.tax_id)
        .bind(&client.license_number)
        .bind(client.license_expiry)
        .bind(&client.phone)
        .bind(&client.address)
        .bind(&client.notes)
        .bind(client.status)
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                conflict_error("Client", "tax_id", &client.tax_id)
            } else {
                AppError::Storage(e)
            }
        })?;

        Ok(())
    }

    async fn get_client(&self, id: Uuid) -> AppResult<Option<Client>> {
        let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(client)
    }

    async fn list_clients(&self) -> AppResult<Vec<Client>> {
        let clients = sqlx::query_as::<_, Client>("SELECT * FROM clients ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(clients)
    }

    async fn get_reservation(&self, id: Uuid) -> AppResult<Option<Reservation>> {
        let reservation = sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(reservation)
    }

    async fn list_reservations(&self, status: Option<ReservationStatus>) -> AppResult<Vec<Reservation>> {
        let reservations = match status {
            Some(status) => {
                sqlx::query_as::<_, Reservation>(
                    "SELECT * FROM reservations WHERE status = $1 ORDER BY start_date DESC, id",
                )
                .bind(status)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Reservation>("SELECT * FROM reservations ORDER BY start_date DESC, id")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(reservations)
    }

    async fn active_bookings(&self) -> AppResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT * FROM reservations WHERE status IN {} ORDER BY vehicle_id, start_date",
            ACTIVE_STATUSES
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(reservations)
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
