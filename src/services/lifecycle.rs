//! Ciclo de vida de la reserva
//!
//! La máquina de estados Reserved → Delivered → Returned, o Reserved → Cancelled.
//! Cada transición es una guarda pura sobre un [`LockedView`] que devuelve el
//! [`Changeset`] a confirmar. Las guardas nunca escriben; una guarda fallida se
//! informa como `StateConflict` con la precondición y el ledger descarta la
//! unidad de trabajo.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{Reservation, ReservationStatus, Vehicle, VehicleStatus};
use crate::repositories::{Changeset, LockedView};
use crate::services::availability::{self, RentalPeriod};
use crate::services::billing::{self, Settlement, SettlementInput};
use crate::utils::errors::{validation_error, AppError, AppResult};
use crate::utils::validation::ensure_amount;

/// Reserva por crear
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub client_id: Uuid,
    pub period: RentalPeriod,
    pub franchise_km: i64,
    pub advance_payment: Decimal,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Datos de entrega confirmados al entregar
#[derive(Debug, Clone)]
pub struct Handover {
    pub odometer_out: i64,
    /// Día real de entrega, si difiere del inicio reservado
    pub start_date: Option<NaiveDate>,
}

/// Cargos puntuales registrados en la devolución
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Adjustments {
    pub wash_cost: Decimal,
    pub fines: Decimal,
    pub damages: Decimal,
    pub other_charges: Decimal,
}

impl Adjustments {
    pub fn validate(&self) -> AppResult<()> {
        ensure_amount("wash_cost", self.wash_cost)?;
        ensure_amount("fines", self.fines)?;
        ensure_amount("damages", self.damages)?;
        ensure_amount("other_charges", self.other_charges)
    }
}

/// Datos de devolución confirmados cuando vuelve el vehículo
#[derive(Debug, Clone)]
pub struct VehicleReturn {
    pub odometer_in: i64,
    pub adjustments: Adjustments,
    pub return_date: NaiveDate,
}

/// Campos modificables de una reserva existente
#[derive(Debug, Clone, Default)]
pub struct ReservationPatch {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub vehicle_id: Option<Uuid>,
    pub franchise_km: Option<i64>,
    pub advance_payment: Option<Decimal>,
    pub wash_cost: Option<Decimal>,
    pub fines: Option<Decimal>,
    pub damages: Option<Decimal>,
    pub other_charges: Option<Decimal>,
}

impl ReservationPatch {
    fn moves_schedule(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some() || self.vehicle_id.is_some()
    }

    /// Comprobaciones de entrada que no necesitan estado guardado
    pub fn validate(&self) -> AppResult<()> {
        if let Some(km) = self.franchise_km {
            if km < 0 {
                return Err(validation_error("franchise_km", "must not be negative"));
            }
        }
        if let Some(v) = self.advance_payment {
            ensure_amount("advance_payment", v)?;
        }
        if let Some(v) = self.wash_cost {
            ensure_amount("wash_cost", v)?;
        }
        if let Some(v) = self.fines {
            ensure_amount("fines", v)?;
        }
        if let Some(v) = self.damages {
            ensure_amount("damages", v)?;
        }
        if let Some(v) = self.other_charges {
            ensure_amount("other_charges", v)?;
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            RentalPeriod::new(start, end)?;
        }
        Ok(())
    }
}

/// Cargo por tiempo proyectado para un periodo reservado a la tarifa actual del vehículo
pub fn projected_time_charge(period: &RentalPeriod, vehicle: &Vehicle) -> AppResult<Decimal> {
    Decimal::from(period.billable_days())
        .checked_mul(vehicle.daily_rate)
        .ok_or_else(|| validation_error("daily_rate", "projected charge exceeds the supported range"))
}

fn conflict(id: Uuid, guard: impl Into<String>) -> AppError {
    AppError::state_conflict("reservation", id, guard)
}

fn require_status(reservation: &Reservation, expected: ReservationStatus, action: &str) -> AppResult<()> {
    if reservation.status != expected {
        return Err(conflict(
            reservation.id,
            format!(
                "cannot {} a {} reservation (requires {})",
                action,
                reservation.status.as_str(),
                expected.as_str()
            ),
        ));
    }
    Ok(())
}

fn ensure_free(
    view: &LockedView,
    reservation_id: Uuid,
    vehicle: &Vehicle,
    period: &RentalPeriod,
    exclude: Option<Uuid>,
) -> AppResult<()> {
    if !availability::is_bookable(vehicle) {
        return Err(conflict(
            reservation_id,
            format!("vehicle {} is {} and cannot be booked", vehicle.plate, vehicle.status.as_str()),
        ));
    }
    let blocking = availability::conflicts(&view.bookings, vehicle.id, period, exclude);
    if let Some(existing) = blocking.first() {
        return Err(conflict(
            reservation_id,
            format!(
                "vehicle {} not available for {} to {} (held by reservation {})",
                vehicle.plate,
                period.start(),
                period.end(),
                existing.id
            ),
        ));
    }
    Ok(())
}

/// Crear una reserva Reserved si el vehículo está libre y el cliente activo
pub fn create(view: &LockedView, booking: &NewBooking) -> AppResult<Changeset> {
    let vehicle = view.vehicle(booking.vehicle_id)?;
    let client = view.client(booking.client_id)?;

    if !client.is_active() {
        return Err(AppError::state_conflict(
            "client",
            client.id,
            "client has been removed and cannot book",
        ));
    }
    ensure_free(view, booking.id, vehicle, &booking.period, None)?;
    projected_time_charge(&booking.period, vehicle)?;

    let reservation = Reservation {
        id: booking.id,
        vehicle_id: vehicle.id,
        client_id: client.id,
        start_date: booking.period.start(),
        end_date: booking.period.end(),
        status: ReservationStatus::Reserved,
        odometer_out: vehicle.odometer,
        odometer_in: None,
        franchise_km: booking.franchise_km,
        advance_payment: booking.advance_payment,
        wash_cost: Decimal::ZERO,
        fines: Decimal::ZERO,
        damages: Decimal::ZERO,
        other_charges: Decimal::ZERO,
        returned_on: None,
        settlement: None,
        created_by: booking.created_by.clone(),
        created_at: booking.created_at,
        updated_at: booking.created_at,
    };

    Ok(Changeset::default().reservation(reservation))
}

/// Entregar el vehículo: Reserved → Delivered, vehículo → Rented
pub fn deliver(view: &LockedView, reservation_id: Uuid, handover: &Handover) -> AppResult<Changeset> {
    let current = view.reservation(reservation_id)?;
    require_status(current, ReservationStatus::Reserved, "deliver")?;

    let vehicle = view.vehicle(current.vehicle_id)?;
    if matches!(
        vehicle.status,
        VehicleStatus::Rented | VehicleStatus::Unavailable | VehicleStatus::Retired
    ) {
        return Err(AppError::state_conflict(
            "vehicle",
            vehicle.id,
            format!("vehicle {} is {} and cannot be handed over", vehicle.plate, vehicle.status.as_str()),
        ));
    }

    let recorded = vehicle.odometer.max(current.odometer_out);
    if handover.odometer_out < recorded {
        return Err(conflict(
            reservation_id,
            format!(
                "odometer out {} is below the recorded reading {}",
                handover.odometer_out, recorded
            ),
        ));
    }

    let start_date = handover.start_date.unwrap_or(current.start_date);
    if start_date > current.end_date {
        return Err(conflict(
            reservation_id,
            format!("handover date {} is after the booked end date {}", start_date, current.end_date),
        ));
    }
    if start_date != current.start_date {
        let period = RentalPeriod::new(start_date, current.end_date)?;
        ensure_free(view, reservation_id, vehicle, &period, Some(reservation_id))?;
    }

    let client = view.client(current.client_id)?;
    if !client.license_valid_on(start_date) {
        return Err(AppError::state_conflict(
            "client",
            client.id,
            format!("driver license expired on {}", client.license_expiry),
        ));
    }

    let mut reservation = current.clone();
    reservation.status = ReservationStatus::Delivered;
    reservation.start_date = start_date;
    reservation.odometer_out = handover.odometer_out;

    let mut vehicle = vehicle.clone();
    vehicle.status = VehicleStatus::Rented;
    vehicle.odometer = handover.odometer_out;

    Ok(Changeset::default().reservation(reservation).vehicle(vehicle))
}

/// Liquidación que produciría la devolución. Comparte todas las guardas con
/// [`return_vehicle`].
pub fn preview_return(view: &LockedView, reservation_id: Uuid, ret: &VehicleReturn) -> AppResult<Settlement> {
    let current = view.reservation(reservation_id)?;
    require_status(current, ReservationStatus::Delivered, "return")?;
    let vehicle = view.vehicle(current.vehicle_id)?;

    if ret.odometer_in < current.odometer_out {
        return Err(conflict(
            reservation_id,
            format!(
                "odometer in {} is below odometer out {}",
                ret.odometer_in, current.odometer_out
            ),
        ));
    }
    if ret.odometer_in < vehicle.odometer {
        return Err(conflict(
            reservation_id,
            format!(
                "odometer in {} is below the vehicle's recorded reading {}",
                ret.odometer_in, vehicle.odometer
            ),
        ));
    }
    if ret.return_date < current.start_date {
        return Err(conflict(
            reservation_id,
            format!("return date {} is before the start date {}", ret.return_date, current.start_date),
        ));
    }
    ret.adjustments.validate()?;

    billing::settle(&SettlementInput {
        start_date: current.start_date,
        return_date: ret.return_date,
        odometer_out: current.odometer_out,
        odometer_in: ret.odometer_in,
        franchise_km: current.franchise_km,
        daily_rate: vehicle.daily_rate,
        distance_rate: vehicle.distance_rate,
        wash_cost: ret.adjustments.wash_cost,
        fines: ret.adjustments.fines,
        damages: ret.adjustments.damages,
        other_charges: ret.adjustments.other_charges,
        advance_payment: current.advance_payment,
    })
}

/// Cerrar el alquiler: Delivered → Returned, vehículo → Available
pub fn return_vehicle(view: &LockedView, reservation_id: Uuid, ret: &VehicleReturn) -> AppResult<Changeset> {
    let settlement = preview_return(view, reservation_id, ret)?;
    let current = view.reservation(reservation_id)?;
    let vehicle = view.vehicle(current.vehicle_id)?;

    let mut reservation = current.clone();
    reservation.status = ReservationStatus::Returned;
    reservation.odometer_in = Some(ret.odometer_in);
    reservation.returned_on = Some(ret.return_date);
    reservation.wash_cost = ret.adjustments.wash_cost;
    reservation.fines = ret.adjustments.fines;
    reservation.damages = ret.adjustments.damages;
    reservation.other_charges = ret.adjustments.other_charges;
    reservation.settlement = Some(sqlx::types::Json(settlement));

    let mut vehicle = vehicle.clone();
    vehicle.status = VehicleStatus::Available;
    vehicle.odometer = ret.odometer_in;

    Ok(Changeset::default().reservation(reservation).vehicle(vehicle))
}

/// Cancelar una reserva aún no entregada. El vehículo no cambia.
pub fn cancel(view: &LockedView, reservation_id: Uuid) -> AppResult<Changeset> {
    let current = view.reservation(reservation_id)?;
    if current.status == ReservationStatus::Delivered {
        return Err(conflict(
            reservation_id,
            "cannot cancel a delivered reservation; it must be returned",
        ));
    }
    require_status(current, ReservationStatus::Reserved, "cancel")?;

    let mut reservation = current.clone();
    reservation.status = ReservationStatus::Cancelled;
    Ok(Changeset::default().reservation(reservation))
}

/// Aplicar una modificación. Las reservas terminales son inmutables; tras la
/// entrega el vehículo y la fecha de inicio quedan fijos.
pub fn edit(view: &LockedView, reservation_id: Uuid, patch: &ReservationPatch) -> AppResult<Changeset> {
    let current = view.reservation(reservation_id)?;
    if current.status.is_terminal() {
        return Err(conflict(
            reservation_id,
            format!("a {} reservation cannot be edited", current.status.as_str()),
        ));
    }

    let delivered = current.status == ReservationStatus::Delivered;
    if delivered {
        if patch.vehicle_id.is_some_and(|v| v != current.vehicle_id) {
            return Err(conflict(reservation_id, "cannot change the vehicle of a delivered reservation"));
        }
        if patch.start_date.is_some_and(|d| d != current.start_date) {
            return Err(conflict(reservation_id, "cannot change the start date of a delivered reservation"));
        }
    }

    let mut reservation = current.clone();

    if patch.moves_schedule() {
        let start = patch.start_date.unwrap_or(current.start_date);
        let end = patch.end_date.unwrap_or(current.end_date);
        let period = RentalPeriod::new(start, end)?;

        let target_id = patch.vehicle_id.unwrap_or(current.vehicle_id);
        let target = view.vehicle(target_id)?;
        if target.status == VehicleStatus::Retired {
            return Err(AppError::ReferentialConflict {
                entity: "vehicle",
                id: target.id,
                outstanding: view.outstanding_for_vehicle(target.id),
            });
        }

        if delivered {
            // El vehículo ya salió; solo otras reservas pueden bloquear la nueva fecha de fin
            let blocking = availability::conflicts(&view.bookings, target.id, &period, Some(reservation_id));
            if let Some(existing) = blocking.first() {
                return Err(conflict(
                    reservation_id,
                    format!("vehicle {} not available until {} (held by reservation {})", target.plate, end, existing.id),
                ));
            }
        } else {
            ensure_free(view, reservation_id, target, &period, Some(reservation_id))?;
        }

        if target.id != current.vehicle_id {
            reservation.vehicle_id = target.id;
            reservation.odometer_out = target.odometer;
        }
        reservation.start_date = start;
        reservation.end_date = end;
    }

    if let Some(km) = patch.franchise_km {
        reservation.franchise_km = km;
    }
    if let Some(v) = patch.advance_payment {
        reservation.advance_payment = v;
    }
    if let Some(v) = patch.wash_cost {
        reservation.wash_cost = v;
    }
    if let Some(v) = patch.fines {
        reservation.fines = v;
    }
    if let Some(v) = patch.damages {
        reservation.damages = v;
    }
    if let Some(v) = patch.other_charges {
        reservation.other_charges = v;
    }

    Ok(Changeset::default().reservation(reservation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Client, NewClient};
    use crate::services::availability::tests::{booking, day, vehicle};
    use crate::services::billing::SettlementKind;

    fn client(license_expiry: NaiveDate) -> Client {
        NewClient {
            name: "Maria Souza".to_string(),
            tax_id: "123.456.789-00".to_string(),
            license_number: "04512345678".to_string(),
            license_expiry,
            phone: "+55 11 99999-0000".to_string(),
            address: None,
            notes: None,
        }
        .into_client(Uuid::new_v4(), Utc::now())
    }

    fn new_booking(vehicle: &Vehicle, client: &Client, start: u32, end: u32) -> NewBooking {
        NewBooking {
            id: Uuid::new_v4(),
            vehicle_id: vehicle.id,
            client_id: client.id,
            period: RentalPeriod::new(day(start), day(end)).unwrap(),
            franchise_km: 300,
            advance_payment: Decimal::from(50),
            created_by: "desk".to_string(),
            created_at: Utc::now(),
        }
    }

    /// Vista bloqueada sobre una reserva, su vehículo y su cliente
    fn locked(reservation: &Reservation, vehicle: &Vehicle, client: &Client, others: &[Reservation]) -> LockedView {
        let mut bookings = vec![reservation.clone()];
        bookings.extend(others.iter().cloned());
        LockedView {
            reservation: Some(reservation.clone()),
            vehicles: vec![vehicle.clone()],
            client: Some(client.clone()),
            bookings,
            client_bookings: vec![],
        }
    }

    fn booked(vehicle: &Vehicle, client: &Client, start: u32, end: u32, status: ReservationStatus) -> Reservation {
        let mut r = booking(vehicle.id, start, end, status);
        r.client_id = client.id;
        r.odometer_out = vehicle.odometer;
        r
    }

    fn expect_state_conflict(result: AppResult<Changeset>) -> String {
        match result {
            Err(AppError::StateConflict { guard, .. }) => guard,
            other => panic!("expected state conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_create_seeds_odometer_and_leaves_vehicle() {
        let v = vehicle(VehicleStatus::Available);
        let c = client(day(30));
        let view = LockedView {
            vehicles: vec![v.clone()],
            client: Some(c.clone()),
            ..LockedView::default()
        };

        let changes = create(&view, &new_booking(&v, &c, 10, 15)).unwrap();
        assert_eq!(changes.reservations.len(), 1);
        assert!(changes.vehicles.is_empty());
        let r = &changes.reservations[0];
        assert_eq!(r.status, ReservationStatus::Reserved);
        assert_eq!(r.odometer_out, v.odometer);
    }

    #[test]
    fn test_create_rejects_overlap_and_allows_turnover() {
        let v = vehicle(VehicleStatus::Available);
        let c = client(day(30));
        let existing = booked(&v, &c, 1, 10, ReservationStatus::Reserved);
        let view = LockedView {
            vehicles: vec![v.clone()],
            client: Some(c.clone()),
            bookings: vec![existing],
            ..LockedView::default()
        };

        let guard = expect_state_conflict(create(&view, &new_booking(&v, &c, 5, 12)));
        assert!(guard.contains("not available"));
        assert!(create(&view, &new_booking(&v, &c, 10, 12)).is_ok());
    }

    #[test]
    fn test_create_requires_active_client() {
        let v = vehicle(VehicleStatus::Available);
        let mut c = client(day(30));
        c.status = crate::models::ClientStatus::Removed;
        let view = LockedView {
            vehicles: vec![v.clone()],
            client: Some(c.clone()),
            ..LockedView::default()
        };
        assert!(matches!(
            create(&view, &new_booking(&v, &c, 10, 12)),
            Err(AppError::StateConflict { entity: "client", .. })
        ));
    }

    #[test]
    fn test_create_rejects_unavailable_vehicle() {
        let v = vehicle(VehicleStatus::Unavailable);
        let c = client(day(30));
        let view = LockedView {
            vehicles: vec![v.clone()],
            client: Some(c.clone()),
            ..LockedView::default()
        };
        expect_state_conflict(create(&view, &new_booking(&v, &c, 10, 12)));
    }

    #[test]
    fn test_deliver_marks_vehicle_rented() {
        let v = vehicle(VehicleStatus::Available);
        let c = client(day(30));
        let r = booked(&v, &c, 10, 15, ReservationStatus::Reserved);
        let view = locked(&r, &v, &c, &[]);

        let changes = deliver(&view, r.id, &Handover { odometer_out: 10_020, start_date: None }).unwrap();
        assert_eq!(changes.reservations[0].status, ReservationStatus::Delivered);
        assert_eq!(changes.reservations[0].odometer_out, 10_020);
        assert_eq!(changes.vehicles[0].status, VehicleStatus::Rented);
        assert_eq!(changes.vehicles[0].odometer, 10_020);
    }

    #[test]
    fn test_deliver_rejects_odometer_regression() {
        let v = vehicle(VehicleStatus::Available);
        let c = client(day(30));
        let r = booked(&v, &c, 10, 15, ReservationStatus::Reserved);
        let view = locked(&r, &v, &c, &[]);

        let guard = expect_state_conflict(deliver(&view, r.id, &Handover { odometer_out: 9_999, start_date: None }));
        assert!(guard.contains("odometer"));
    }

    #[test]
    fn test_deliver_moved_start_rechecks_availability() {
        let v = vehicle(VehicleStatus::Available);
        let c = client(day(30));
        let earlier = booked(&v, &c, 1, 9, ReservationStatus::Reserved);
        let r = booked(&v, &c, 10, 15, ReservationStatus::Reserved);
        let view = locked(&r, &v, &c, &[earlier]);

        let handover = Handover { odometer_out: 10_000, start_date: Some(day(8)) };
        expect_state_conflict(deliver(&view, r.id, &handover));

        let handover = Handover { odometer_out: 10_000, start_date: Some(day(9)) };
        assert_eq!(deliver(&view, r.id, &handover).unwrap().reservations[0].start_date, day(9));
    }

    #[test]
    fn test_deliver_rejects_expired_license() {
        let v = vehicle(VehicleStatus::Available);
        let c = client(day(9));
        let r = booked(&v, &c, 10, 15, ReservationStatus::Reserved);
        let view = locked(&r, &v, &c, &[]);

        assert!(matches!(
            deliver(&view, r.id, &Handover { odometer_out: 10_000, start_date: None }),
            Err(AppError::StateConflict { entity: "client", .. })
        ));
    }

    #[test]
    fn test_deliver_requires_vehicle_on_site() {
        let v = vehicle(VehicleStatus::Rented);
        let c = client(day(30));
        let r = booked(&v, &c, 10, 15, ReservationStatus::Reserved);
        let view = locked(&r, &v, &c, &[]);

        assert!(matches!(
            deliver(&view, r.id, &Handover { odometer_out: 10_000, start_date: None }),
            Err(AppError::StateConflict { entity: "vehicle", .. })
        ));
    }

    #[test]
    fn test_return_settles_and_releases_vehicle() {
        let mut v = vehicle(VehicleStatus::Rented);
        v.daily_rate = Decimal::from(100);
        v.distance_rate = Decimal::new(25, 1);
        let c = client(day(30));
        let mut r = booked(&v, &c, 1, 4, ReservationStatus::Delivered);
        r.advance_payment = Decimal::from(150);
        let view = locked(&r, &v, &c, &[]);

        let ret = VehicleReturn {
            odometer_in: 10_450,
            adjustments: Adjustments::default(),
            return_date: day(4),
        };
        let changes = return_vehicle(&view, r.id, &ret).unwrap();

        let returned = &changes.reservations[0];
        assert_eq!(returned.status, ReservationStatus::Returned);
        assert_eq!(returned.odometer_in, Some(10_450));
        assert_eq!(returned.returned_on, Some(day(4)));
        let settlement = returned.settlement().unwrap();
        assert_eq!(settlement.total, Decimal::from(525));
        assert_eq!(settlement.kind(), SettlementKind::AmountDue);

        assert_eq!(changes.vehicles[0].status, VehicleStatus::Available);
        assert_eq!(changes.vehicles[0].odometer, 10_450);
    }

    #[test]
    fn test_return_guards() {
        let v = vehicle(VehicleStatus::Rented);
        let c = client(day(30));
        let r = booked(&v, &c, 5, 8, ReservationStatus::Delivered);
        let view = locked(&r, &v, &c, &[]);

        let below = VehicleReturn {
            odometer_in: 9_000,
            adjustments: Adjustments::default(),
            return_date: day(8),
        };
        expect_state_conflict(return_vehicle(&view, r.id, &below));

        let before_start = VehicleReturn {
            odometer_in: 10_100,
            adjustments: Adjustments::default(),
            return_date: day(4),
        };
        expect_state_conflict(return_vehicle(&view, r.id, &before_start));

        let negative = VehicleReturn {
            odometer_in: 10_100,
            adjustments: Adjustments {
                fines: Decimal::from(-10),
                ..Adjustments::default()
            },
            return_date: day(8),
        };
        assert!(matches!(return_vehicle(&view, r.id, &negative), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_return_requires_delivered() {
        let v = vehicle(VehicleStatus::Available);
        let c = client(day(30));
        let r = booked(&v, &c, 5, 8, ReservationStatus::Reserved);
        let view = locked(&r, &v, &c, &[]);

        let ret = VehicleReturn {
            odometer_in: 10_100,
            adjustments: Adjustments::default(),
            return_date: day(8),
        };
        expect_state_conflict(return_vehicle(&view, r.id, &ret));
        assert!(preview_return(&view, r.id, &ret).is_err());
    }

    #[test]
    fn test_cancel_delivered_is_rejected() {
        let v = vehicle(VehicleStatus::Rented);
        let c = client(day(30));
        let r = booked(&v, &c, 5, 8, ReservationStatus::Delivered);
        let view = locked(&r, &v, &c, &[]);

        let guard = expect_state_conflict(cancel(&view, r.id));
        assert!(guard.contains("cannot cancel a delivered reservation"));
    }

    #[test]
    fn test_terminal_states_are_final() {
        let v = vehicle(VehicleStatus::Available);
        let c = client(day(30));
        for status in [ReservationStatus::Returned, ReservationStatus::Cancelled] {
            let r = booked(&v, &c, 5, 8, status);
            let view = locked(&r, &v, &c, &[]);
            expect_state_conflict(cancel(&view, r.id));
            expect_state_conflict(deliver(&view, r.id, &Handover { odometer_out: 10_000, start_date: None }));
            expect_state_conflict(edit(&view, r.id, &ReservationPatch::default()));
        }
    }

    #[test]
    fn test_cancel_reserved_leaves_vehicle() {
        let v = vehicle(VehicleStatus::Available);
        let c = client(day(30));
        let r = booked(&v, &c, 5, 8, ReservationStatus::Reserved);
        let view = locked(&r, &v, &c, &[]);

        let changes = cancel(&view, r.id).unwrap();
        assert_eq!(changes.reservations[0].status, ReservationStatus::Cancelled);
        assert!(changes.vehicles.is_empty());
    }

    #[test]
    fn test_edit_period_ignores_own_booking() {
        let v = vehicle(VehicleStatus::Available);
        let c = client(day(30));
        let r = booked(&v, &c, 5, 8, ReservationStatus::Reserved);
        let other = booked(&v, &c, 12, 14, ReservationStatus::Reserved);
        let view = locked(&r, &v, &c, &[other]);

        let extend = ReservationPatch {
            end_date: Some(day(11)),
            ..ReservationPatch::default()
        };
        assert_eq!(edit(&view, r.id, &extend).unwrap().reservations[0].end_date, day(11));

        // Entregar el día en que empieza la siguiente reserva es un relevo
        let turnover = ReservationPatch {
            end_date: Some(day(12)),
            ..ReservationPatch::default()
        };
        assert_eq!(edit(&view, r.id, &turnover).unwrap().reservations[0].end_date, day(12));

        let overlap = ReservationPatch {
            end_date: Some(day(13)),
            ..ReservationPatch::default()
        };
        expect_state_conflict(edit(&view, r.id, &overlap));
    }

    #[test]
    fn test_turnover_pair_earlier_booking_stays_editable() {
        let v = vehicle(VehicleStatus::Available);
        let c = client(day(30));
        let earlier = booked(&v, &c, 1, 10, ReservationStatus::Reserved);
        let later = booked(&v, &c, 10, 15, ReservationStatus::Reserved);
        let view = locked(&earlier, &v, &c, &[later]);

        let shorten = ReservationPatch {
            start_date: Some(day(2)),
            ..ReservationPatch::default()
        };
        let changed = &edit(&view, earlier.id, &shorten).unwrap().reservations[0];
        assert_eq!((changed.start_date, changed.end_date), (day(2), day(10)));

        let money_only = ReservationPatch {
            advance_payment: Some(Decimal::from(200)),
            ..ReservationPatch::default()
        };
        assert!(edit(&view, earlier.id, &money_only).is_ok());

        let overrun = ReservationPatch {
            end_date: Some(day(11)),
            ..ReservationPatch::default()
        };
        expect_state_conflict(edit(&view, earlier.id, &overrun));
    }

    #[test]
    fn test_turnover_pair_earlier_booking_delivers_with_moved_start() {
        let v = vehicle(VehicleStatus::Available);
        let c = client(day(30));
        let earlier = booked(&v, &c, 1, 10, ReservationStatus::Reserved);
        let later = booked(&v, &c, 10, 15, ReservationStatus::Reserved);
        let view = locked(&earlier, &v, &c, &[later.clone()]);

        let handover = Handover { odometer_out: 10_000, start_date: Some(day(3)) };
        let changes = deliver(&view, earlier.id, &handover).unwrap();
        assert_eq!(changes.reservations[0].start_date, day(3));
        assert_eq!(changes.reservations[0].status, ReservationStatus::Delivered);

        // La reserva posterior del par también se revalida sin conflicto
        let view = locked(&later, &v, &c, &[earlier]);
        let handover = Handover { odometer_out: 10_000, start_date: Some(day(11)) };
        assert_eq!(deliver(&view, later.id, &handover).unwrap().reservations[0].start_date, day(11));
    }

    #[test]
    fn test_edit_reassigns_vehicle_and_reseeds_odometer() {
        let v = vehicle(VehicleStatus::Available);
        let mut other = vehicle(VehicleStatus::Available);
        other.odometer = 42_000;
        let c = client(day(30));
        let r = booked(&v, &c, 5, 8, ReservationStatus::Reserved);
        let mut view = locked(&r, &v, &c, &[]);
        view.vehicles.push(other.clone());

        let patch = ReservationPatch {
            vehicle_id: Some(other.id),
            ..ReservationPatch::default()
        };
        let changed = &edit(&view, r.id, &patch).unwrap().reservations[0];
        assert_eq!(changed.vehicle_id, other.id);
        assert_eq!(changed.odometer_out, 42_000);
    }

    #[test]
    fn test_edit_to_retired_vehicle_is_referential_conflict() {
        let v = vehicle(VehicleStatus::Available);
        let retired = vehicle(VehicleStatus::Retired);
        let c = client(day(30));
        let r = booked(&v, &c, 5, 8, ReservationStatus::Reserved);
        let mut view = locked(&r, &v, &c, &[]);
        view.vehicles.push(retired.clone());

        let patch = ReservationPatch {
            vehicle_id: Some(retired.id),
            ..ReservationPatch::default()
        };
        assert!(matches!(edit(&view, r.id, &patch), Err(AppError::ReferentialConflict { .. })));
    }

    #[test]
    fn test_edit_delivered_fixes_vehicle_and_start() {
        let v = vehicle(VehicleStatus::Rented);
        let other = vehicle(VehicleStatus::Available);
        let c = client(day(30));
        let r = booked(&v, &c, 5, 8, ReservationStatus::Delivered);
        let mut view = locked(&r, &v, &c, &[]);
        view.vehicles.push(other.clone());

        let move_vehicle = ReservationPatch {
            vehicle_id: Some(other.id),
            ..ReservationPatch::default()
        };
        expect_state_conflict(edit(&view, r.id, &move_vehicle));

        let move_start = ReservationPatch {
            start_date: Some(day(6)),
            ..ReservationPatch::default()
        };
        expect_state_conflict(edit(&view, r.id, &move_start));

        let extend = ReservationPatch {
            end_date: Some(day(10)),
            fines: Some(Decimal::from(80)),
            ..ReservationPatch::default()
        };
        let changed = &edit(&view, r.id, &extend).unwrap().reservations[0];
        assert_eq!(changed.end_date, day(10));
        assert_eq!(changed.fines, Decimal::from(80));
        assert_eq!(changed.status, ReservationStatus::Delivered);
    }

    #[test]
    fn test_projected_time_charge() {
        let v = vehicle(VehicleStatus::Available);
        let period = RentalPeriod::new(day(10), day(13)).unwrap();
        assert_eq!(projected_time_charge(&period, &v).unwrap(), Decimal::from(300));
    }

    #[test]
    fn test_create_rejects_rate_too_large_to_project() {
        let mut v = vehicle(VehicleStatus::Available);
        v.daily_rate = Decimal::MAX;
        let c = client(day(30));
        let view = LockedView {
            vehicles: vec![v.clone()],
            client: Some(c.clone()),
            ..LockedView::default()
        };

        assert!(matches!(create(&view, &new_booking(&v, &c, 10, 12)), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_return_with_oversized_distance_is_rejected() {
        let mut v = vehicle(VehicleStatus::Rented);
        v.distance_rate = Decimal::new(999_999_999_999, 2);
        let c = client(day(30));
        let r = booked(&v, &c, 1, 4, ReservationStatus::Delivered);
        let view = locked(&r, &v, &c, &[]);

        let ret = VehicleReturn {
            odometer_in: i64::MAX,
            adjustments: Adjustments::default(),
            return_date: day(4),
        };
        assert!(matches!(preview_return(&view, r.id, &ret), Err(AppError::Validation(_))));
        assert!(matches!(return_vehicle(&view, r.id, &ret), Err(AppError::Validation(_))));
    }
}
