//! Guardas del registro de vehículos
//!
//! Cambios de estado y de atributos de los vehículos. Rented pertenece al ciclo
//! de vida de la reserva y no se puede fijar ni quitar aquí.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{Vehicle, VehicleStatus};
use crate::repositories::{Changeset, LockedView};
use crate::utils::errors::{validation_error, AppError, AppResult};
use crate::utils::validation::ensure_amount;

#[derive(Debug, Clone, Default)]
pub struct VehicleUpdate {
    pub model: Option<String>,
    pub color: Option<String>,
    pub year: Option<i32>,
    pub daily_rate: Option<Decimal>,
    pub distance_rate: Option<Decimal>,
    pub odometer: Option<i64>,
    pub next_service_odometer: Option<i64>,
}

impl VehicleUpdate {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(rate) = self.daily_rate {
            ensure_amount("daily_rate", rate)?;
        }
        if let Some(rate) = self.distance_rate {
            ensure_amount("distance_rate", rate)?;
        }
        if self.odometer.is_some_and(|km| km < 0) {
            return Err(validation_error("odometer", "must not be negative"));
        }
        Ok(())
    }
}

fn not_retired(vehicle: &Vehicle) -> AppResult<()> {
    if vehicle.status == VehicleStatus::Retired {
        return Err(AppError::state_conflict("vehicle", vehicle.id, "vehicle is retired"));
    }
    Ok(())
}

fn outstanding(view: &LockedView, vehicle: &Vehicle) -> AppResult<()> {
    let count = view.outstanding_for_vehicle(vehicle.id);
    if count > 0 {
        return Err(AppError::ReferentialConflict {
            entity: "vehicle",
            id: vehicle.id,
            outstanding: count,
        });
    }
    Ok(())
}

pub fn update(view: &LockedView, id: Uuid, patch: &VehicleUpdate) -> AppResult<Changeset> {
    let current = view.vehicle(id)?;
    not_retired(current)?;

    if let Some(km) = patch.odometer {
        if km < current.odometer {
            return Err(AppError::state_conflict(
                "vehicle",
                id,
                format!("odometer cannot go back from {} to {}", current.odometer, km),
            ));
        }
    }

    let mut vehicle = current.clone();
    if let Some(model) = &patch.model {
        vehicle.model = model.trim().to_string();
    }
    if let Some(color) = &patch.color {
        vehicle.color = Some(color.clone());
    }
    if let Some(year) = patch.year {
        vehicle.year = Some(year);
    }
    if let Some(rate) = patch.daily_rate {
        vehicle.daily_rate = rate;
    }
    if let Some(rate) = patch.distance_rate {
        vehicle.distance_rate = rate;
    }
    if let Some(km) = patch.odometer {
        vehicle.odometer = km;
    }
    if let Some(km) = patch.next_service_odometer {
        vehicle.next_service_odometer = km;
    }

    Ok(Changeset::default().vehicle(vehicle))
}

/// Pasar un vehículo entre Available y Unavailable
pub fn set_status(view: &LockedView, id: Uuid, status: VehicleStatus) -> AppResult<Changeset> {
    if !matches!(status, VehicleStatus::Available | VehicleStatus::Unavailable) {
        return Err(validation_error("status", "only available or unavailable can be set"));
    }

    let current = view.vehicle(id)?;
    not_retired(current)?;
    if current.status == VehicleStatus::Rented {
        return Err(AppError::state_conflict(
            "vehicle",
            id,
            "vehicle is rented; its status changes on return",
        ));
    }
    if status == VehicleStatus::Unavailable {
        outstanding(view, current)?;
    }

    let mut vehicle = current.clone();
    vehicle.status = status;
    Ok(Changeset::default().vehicle(vehicle))
}

/// Baja lógica: la fila se conserva para las reservas históricas
pub fn retire(view: &LockedView, id: Uuid) -> AppResult<Changeset> {
    let current = view.vehicle(id)?;
    not_retired(current)?;
    outstanding(view, current)?;

    let mut vehicle = current.clone();
    vehicle.status = VehicleStatus::Retired;
    Ok(Changeset::default().vehicle(vehicle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReservationStatus;
    use crate::services::availability::tests::{booking, vehicle};

    fn view_of(v: &Vehicle, statuses: &[ReservationStatus]) -> LockedView {
        LockedView {
            vehicles: vec![v.clone()],
            bookings: statuses.iter().map(|s| booking(v.id, 5, 8, *s)).collect(),
            ..LockedView::default()
        }
    }

    #[test]
    fn test_odometer_cannot_decrease() {
        let v = vehicle(VehicleStatus::Available);
        let view = view_of(&v, &[]);

        let back = VehicleUpdate {
            odometer: Some(v.odometer - 1),
            ..VehicleUpdate::default()
        };
        assert!(matches!(update(&view, v.id, &back), Err(AppError::StateConflict { .. })));

        let forward = VehicleUpdate {
            odometer: Some(v.odometer + 100),
            daily_rate: Some(Decimal::from(150)),
            ..VehicleUpdate::default()
        };
        let changed = &update(&view, v.id, &forward).unwrap().vehicles[0];
        assert_eq!(changed.odometer, v.odometer + 100);
        assert_eq!(changed.daily_rate, Decimal::from(150));
    }

    #[test]
    fn test_unavailable_requires_no_outstanding_bookings() {
        let v = vehicle(VehicleStatus::Available);
        let view = view_of(&v, &[ReservationStatus::Reserved]);
        assert!(matches!(
            set_status(&view, v.id, VehicleStatus::Unavailable),
            Err(AppError::ReferentialConflict { outstanding: 1, .. })
        ));

        let view = view_of(&v, &[ReservationStatus::Cancelled]);
        let changed = &set_status(&view, v.id, VehicleStatus::Unavailable).unwrap().vehicles[0];
        assert_eq!(changed.status, VehicleStatus::Unavailable);
    }

    #[test]
    fn test_rented_status_is_lifecycle_owned() {
        let v = vehicle(VehicleStatus::Rented);
        let view = view_of(&v, &[]);
        assert!(matches!(
            set_status(&view, v.id, VehicleStatus::Available),
            Err(AppError::StateConflict { .. })
        ));
        assert!(matches!(
            set_status(&view, v.id, VehicleStatus::Rented),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_retire() {
        let v = vehicle(VehicleStatus::Available);
        let busy = view_of(&v, &[ReservationStatus::Delivered]);
        assert!(matches!(retire(&busy, v.id), Err(AppError::ReferentialConflict { .. })));

        let idle = view_of(&v, &[ReservationStatus::Returned]);
        let retired = retire(&idle, v.id).unwrap().vehicles.remove(0);
        assert_eq!(retired.status, VehicleStatus::Retired);

        let again = view_of(&retired, &[]);
        assert!(matches!(retire(&again, v.id), Err(AppError::StateConflict { .. })));
        assert!(matches!(
            update(&again, v.id, &VehicleUpdate::default()),
            Err(AppError::StateConflict { .. })
        ));
    }
}
