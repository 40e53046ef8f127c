//! Ledger / pasarela de persistencia
//!
//! El único componente que abre transacciones de escritura. Todo cambio de estado
//! pasa por [`Ledger::with_lock`]: el backend bloquea los registros indicados por
//! un [`LockScope`], entrega un [`LockedView`] de solo lectura a una guarda pura
//! y aplica el [`Changeset`] que devuelve o lo descarta todo.

pub mod memory_ledger;
pub mod postgres_ledger;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Client, Reservation, ReservationStatus, Vehicle};
use crate::utils::errors::{not_found_error, AppError, AppResult};

pub use memory_ledger::InMemoryLedger;
pub use postgres_ledger::PgLedger;

/// Registros a los que una escritura necesita acceso exclusivo
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockScope {
    pub reservation: Option<Uuid>,
    pub vehicles: Vec<Uuid>,
    pub client: Option<Uuid>,
}

impl LockScope {
    pub fn reservation(id: Uuid) -> Self {
        Self {
            reservation: Some(id),
            ..Self::default()
        }
    }

    pub fn vehicle(id: Uuid) -> Self {
        Self {
            vehicles: vec![id],
            ..Self::default()
        }
    }

    pub fn client(id: Uuid) -> Self {
        Self {
            client: Some(id),
            ..Self::default()
        }
    }

    pub fn with_vehicle(mut self, id: Uuid) -> Self {
        if !self.vehicles.contains(&id) {
            self.vehicles.push(id);
        }
        self
    }

    pub fn with_client(mut self, id: Uuid) -> Self {
        self.client = Some(id);
        self
    }
}

/// Instantánea de los registros bloqueados.
///
/// `vehicles` contiene los vehículos del alcance más el de la reserva bloqueada.
/// `bookings` contiene todas las reservas activas de esos vehículos y
/// `client_bookings` todas las reservas activas del cliente del alcance.
#[derive(Debug, Clone, Default)]
pub struct LockedView {
    pub reservation: Option<Reservation>,
    pub vehicles: Vec<Vehicle>,
    pub client: Option<Client>,
    pub bookings: Vec<Reservation>,
    pub client_bookings: Vec<Reservation>,
}

impl LockedView {
    pub fn vehicle(&self, id: Uuid) -> AppResult<&Vehicle> {
        self.vehicles
            .iter()
            .find(|v| v.id == id)
            .ok_or_else(|| not_found_error("vehicle", id))
    }

    pub fn reservation(&self, id: Uuid) -> AppResult<&Reservation> {
        self.reservation
            .as_ref()
            .filter(|r| r.id == id)
            .ok_or_else(|| not_found_error("reservation", id))
    }

    pub fn client(&self, id: Uuid) -> AppResult<&Client> {
        self.client
            .as_ref()
            .filter(|c| c.id == id)
            .ok_or_else(|| not_found_error("client", id))
    }

    /// Reservas activas que ocupan `vehicle_id`
    pub fn outstanding_for_vehicle(&self, vehicle_id: Uuid) -> usize {
        self.bookings
            .iter()
            .filter(|r| r.vehicle_id == vehicle_id && r.is_active())
            .count()
    }
}

/// Escrituras producidas por una guarda. Las reservas se insertan o actualizan;
/// vehículos y clientes deben existir ya.
#[derive(Debug, Clone, Default)]
pub struct Changeset {
    pub reservations: Vec<Reservation>,
    pub vehicles: Vec<Vehicle>,
    pub clients: Vec<Client>,
}

impl Changeset {
    pub fn reservation(mut self, reservation: Reservation) -> Self {
        self.reservations.push(reservation);
        self
    }

    pub fn vehicle(mut self, vehicle: Vehicle) -> Self {
        self.vehicles.push(vehicle);
        self
    }

    pub fn client(mut self, client: Client) -> Self {
        self.clients.push(client);
        self
    }

    /// Reserva escrita por id; que la guarda no la haya escrito es un bug
    pub fn written_reservation(&self, id: Uuid) -> AppResult<&Reservation> {
        self.reservations
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::Internal(format!("changeset is missing reservation {}", id)))
    }

    pub fn written_vehicle(&self, id: Uuid) -> AppResult<&Vehicle> {
        self.vehicles
            .iter()
            .find(|v| v.id == id)
            .ok_or_else(|| AppError::Internal(format!("changeset is missing vehicle {}", id)))
    }

    pub fn written_client(&self, id: Uuid) -> AppResult<&Client> {
        self.clients
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::Internal(format!("changeset is missing client {}", id)))
    }
}

/// Paso puro de comprobar y construir, ejecutado con el alcance bloqueado
pub type Guard = Box<dyn FnOnce(&LockedView) -> AppResult<Changeset> + Send>;

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Bloquear `scope`, ejecutar `guard` y confirmar su changeset o revertir.
    /// Devuelve el changeset aplicado.
    async fn with_lock(&self, scope: LockScope, guard: Guard) -> AppResult<Changeset>;

    async fn insert_vehicle(&self, vehicle: &Vehicle) -> AppResult<()>;
    async fn get_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>>;
    async fn list_vehicles(&self) -> AppResult<Vec<Vehicle>>;

    async fn insert_client(&self, client: &Client) -> AppResult<()>;
    async fn get_client(&self, id: Uuid) -> AppResult<Option<Client>>;
    async fn list_clients(&self) -> AppResult<Vec<Client>>;

    async fn get_reservation(&self, id: Uuid) -> AppResult<Option<Reservation>>;
    async fn list_reservations(&self, status: Option<ReservationStatus>) -> AppResult<Vec<Reservation>>;

    /// Reservas en Reserved o Delivered, de todos los vehículos
    async fn active_bookings(&self) -> AppResult<Vec<Reservation>>;

    /// Comprobación de vida para el endpoint de salud
    async fn ping(&self) -> AppResult<()>;
}
