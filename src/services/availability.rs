//! Índice de disponibilidad
//!
//! Decide qué vehículos están libres en un periodo solicitado. Todo aquí es una
//! función pura sobre registros ya leídos del ledger: la misma comprobación sirve
//! para la consulta de disponibilidad y, bajo bloqueo, para cada escritura de
//! reservas.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Reservation, Vehicle, VehicleStatus};
use crate::utils::errors::{validation_error, AppResult};

/// Intervalo inclusivo de días naturales `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalPeriod {
    start: NaiveDate,
    end: NaiveDate,
}

impl RentalPeriod {
    /// Rechaza `end < start` antes de tocar el ledger
    pub fn new(start: NaiveDate, end: NaiveDate) -> AppResult<Self> {
        if end < start {
            return Err(validation_error("end_date", "end date must not be before start date"));
        }
        Ok(Self { start, end })
    }

    /// Reconstruye un periodo desde una fila guardada; el CHECK de la tabla lo mantiene ordenado
    pub(crate) fn from_stored(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Días facturados del periodo; un alquiler del mismo día cuenta como uno
    pub fn billable_days(&self) -> i64 {
        (self.end - self.start).num_days().max(1)
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

/// Si una reserva existente bloquea un periodo solicitado.
///
/// Solape inclusivo menos un extremo: una reserva que termina el día D deja el
/// vehículo libre para otra que empieza en D. Al revés sigue siendo conflicto.
pub fn blocks(existing: &RentalPeriod, requested: &RentalPeriod) -> bool {
    existing.start <= requested.end && existing.end > requested.start
}

/// Si una reserva existente bloquea una reserva ya confirmada que se revalida
/// en su propio vehículo. Ambos extremos quedan libres: el par se admitió con
/// una terminando el día en que empieza la otra, en cualquier orden de creación.
pub fn blocks_rescheduled(existing: &RentalPeriod, requested: &RentalPeriod) -> bool {
    existing.start < requested.end && existing.end > requested.start
}

/// El vehículo se puede ofrecer para nuevas reservas. Los vehículos Rented
/// siguen reservables para periodos futuros.
pub fn is_bookable(vehicle: &Vehicle) -> bool {
    vehicle.status.is_bookable()
}

/// Reservas activas de `vehicle_id` que bloquean `period`, ignorando `exclude`.
///
/// Si `exclude` es una reserva activa que ya tiene `vehicle_id`, se revalida
/// esa reserva con [`blocks_rescheduled`]. Cualquier otro caso, incluido mover
/// una reserva a otro vehículo, es una colocación nueva y usa [`blocks`].
pub fn conflicts<'a>(
    bookings: &'a [Reservation],
    vehicle_id: Uuid,
    period: &RentalPeriod,
    exclude: Option<Uuid>,
) -> Vec<&'a Reservation> {
    let rechecked = exclude.is_some_and(|id| {
        bookings
            .iter()
            .any(|r| r.id == id && r.vehicle_id == vehicle_id && r.is_active())
    });

    bookings
        .iter()
        .filter(|r| r.vehicle_id == vehicle_id && r.is_active())
        .filter(|r| Some(r.id) != exclude)
        .filter(|r| {
            if rechecked {
                blocks_rescheduled(&r.period(), period)
            } else {
                blocks(&r.period(), period)
            }
        })
        .collect()
}

/// Vehículos libres en `period`; `exclude` permite que una edición ignore su propia reserva
pub fn find_available<'a>(
    vehicles: &'a [Vehicle],
    bookings: &[Reservation],
    period: &RentalPeriod,
    exclude: Option<Uuid>,
) -> Vec<&'a Vehicle> {
    vehicles
        .iter()
        .filter(|v| is_bookable(v))
        .filter(|v| conflicts(bookings, v.id, period, exclude).is_empty())
        .collect()
}

/// Reservas activas de un vehículo, de la más temprana a la más tardía
pub fn bookings_for<'a>(bookings: &'a [Reservation], vehicle_id: Uuid) -> Vec<&'a Reservation> {
    let mut held: Vec<&Reservation> = bookings
        .iter()
        .filter(|r| r.vehicle_id == vehicle_id && r.is_active())
        .collect();
    held.sort_by_key(|r| (r.start_date, r.end_date));
    held
}

/// Estado mostrado de un vehículo en `today`: un vehículo disponible con una
/// reserva que cubre hoy se muestra como reservado.
pub fn display_status(vehicle: &Vehicle, bookings: &[Reservation], today: NaiveDate) -> VehicleStatus {
    if vehicle.status != VehicleStatus::Available {
        return vehicle.status;
    }
    let reserved_today = bookings_for(bookings, vehicle.id).into_iter().any(|r| {
        r.status == crate::models::ReservationStatus::Reserved && r.period().contains(today)
    });
    if reserved_today {
        VehicleStatus::Reserved
    } else {
        VehicleStatus::Available
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{NewVehicle, ReservationStatus};
    use chrono::Utc;
    use rust_decimal::Decimal;

    pub(crate) fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).expect("valid test date")
    }

    fn period(start: u32, end: u32) -> RentalPeriod {
        RentalPeriod::new(day(start), day(end)).expect("ordered test period")
    }

    pub(crate) fn vehicle(status: VehicleStatus) -> Vehicle {
        let mut v = NewVehicle {
            model: "Gol".to_string(),
            plate: "ABC1234".to_string(),
            color: Some("white".to_string()),
            year: Some(2020),
            daily_rate: Decimal::from(100),
            distance_rate: Decimal::new(5, 1),
            odometer: 10_000,
            next_service_odometer: 20_000,
        }
        .into_vehicle(Uuid::new_v4(), Utc::now());
        v.status = status;
        v
    }

    pub(crate) fn booking(vehicle_id: Uuid, start: u32, end: u32, status: ReservationStatus) -> Reservation {
        let now = Utc::now();
        Reservation {
            id: Uuid::new_v4(),
            vehicle_id,
            client_id: Uuid::new_v4(),
            start_date: day(start),
            end_date: day(end),
            status,
            odometer_out: 10_000,
            odometer_in: None,
            franchise_km: 300,
            advance_payment: Decimal::ZERO,
            wash_cost: Decimal::ZERO,
            fines: Decimal::ZERO,
            damages: Decimal::ZERO,
            other_charges: Decimal::ZERO,
            returned_on: None,
            settlement: None,
            created_by: "test".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_inverted_period_is_rejected() {
        assert!(RentalPeriod::new(day(10), day(9)).is_err());
        assert!(RentalPeriod::new(day(10), day(10)).is_ok());
    }

    #[test]
    fn test_same_day_turnover() {
        let existing = period(10, 15);
        // Empezar el día en que termina la reserva existente está permitido
        assert!(!blocks(&existing, &period(15, 18)));
        // Terminar el día en que empieza la reserva existente no
        assert!(blocks(&existing, &period(5, 10)));
        assert!(blocks(&existing, &period(12, 20)));
        assert!(blocks(&existing, &period(1, 30)));
        assert!(!blocks(&existing, &period(16, 20)));
        assert!(!blocks(&existing, &period(1, 9)));
    }

    #[test]
    fn test_rescheduled_booking_keeps_its_turnover_partner() {
        let later = period(10, 15);
        // La reserva anterior de un relevo puede terminar el día en que empieza la posterior
        assert!(!blocks_rescheduled(&later, &period(2, 10)));
        assert!(!blocks_rescheduled(&later, &period(15, 18)));
        assert!(blocks_rescheduled(&later, &period(2, 11)));
        assert!(blocks_rescheduled(&later, &period(11, 12)));
    }

    #[test]
    fn test_conflicts_rechecks_own_vehicle_only() {
        let v = vehicle(VehicleStatus::Available);
        let other = vehicle(VehicleStatus::Available);
        let earlier = booking(v.id, 1, 10, ReservationStatus::Reserved);
        let later = booking(v.id, 10, 15, ReservationStatus::Reserved);
        let elsewhere = booking(other.id, 10, 15, ReservationStatus::Reserved);
        let bookings = vec![earlier.clone(), later.clone(), elsewhere];

        assert!(conflicts(&bookings, v.id, &period(2, 10), Some(earlier.id)).is_empty());
        assert_eq!(conflicts(&bookings, v.id, &period(2, 11), Some(earlier.id)).len(), 1);
        // Una colocación nueva que termina en un día de inicio sigue bloqueada
        assert_eq!(conflicts(&bookings, v.id, &period(2, 10), None).len(), 1);
        // También mover la reserva anterior al otro vehículo
        assert_eq!(conflicts(&bookings, other.id, &period(2, 10), Some(earlier.id)).len(), 1);
    }

    #[test]
    fn test_find_available_skips_blocked_and_unbookable() {
        let free = vehicle(VehicleStatus::Available);
        let busy = vehicle(VehicleStatus::Available);
        let rented = vehicle(VehicleStatus::Rented);
        let parked = vehicle(VehicleStatus::Unavailable);
        let retired = vehicle(VehicleStatus::Retired);
        let bookings = vec![
            booking(busy.id, 10, 15, ReservationStatus::Reserved),
            booking(rented.id, 1, 9, ReservationStatus::Delivered),
            booking(free.id, 10, 15, ReservationStatus::Cancelled),
        ];
        let vehicles = vec![free.clone(), busy.clone(), rented.clone(), parked, retired];

        let ids: Vec<Uuid> = find_available(&vehicles, &bookings, &period(12, 14), None)
            .into_iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(ids, vec![free.id, rented.id]);
    }

    #[test]
    fn test_exclude_ignores_own_booking() {
        let v = vehicle(VehicleStatus::Available);
        let own = booking(v.id, 10, 15, ReservationStatus::Reserved);
        let bookings = vec![own.clone()];
        let vehicles = vec![v];

        assert!(find_available(&vehicles, &bookings, &period(11, 16), None).is_empty());
        assert_eq!(find_available(&vehicles, &bookings, &period(11, 16), Some(own.id)).len(), 1);
    }

    #[test]
    fn test_display_status_reserved_today() {
        let v = vehicle(VehicleStatus::Available);
        let bookings = vec![booking(v.id, 10, 15, ReservationStatus::Reserved)];

        assert_eq!(display_status(&v, &bookings, day(12)), VehicleStatus::Reserved);
        assert_eq!(display_status(&v, &bookings, day(20)), VehicleStatus::Available);
    }

    #[test]
    fn test_billable_days_minimum_one() {
        assert_eq!(period(10, 10).billable_days(), 1);
        assert_eq!(period(10, 15).billable_days(), 5);
    }
}
