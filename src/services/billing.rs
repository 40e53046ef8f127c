//! Calculadora de facturación
//!
//! Convierte un alquiler devuelto en una liquidación. El cálculo es puro y usa
//! aritmética decimal exacta: las mismas entradas dan siempre las mismas cifras,
//! céntimo a céntimo.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::utils::errors::{validation_error, AppError, AppResult};

/// Todo lo que necesita la liquidación, capturado en la devolución
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementInput {
    pub start_date: NaiveDate,
    pub return_date: NaiveDate,
    pub odometer_out: i64,
    pub odometer_in: i64,
    pub franchise_km: i64,
    pub daily_rate: Decimal,
    pub distance_rate: Decimal,
    pub wash_cost: Decimal,
    pub fines: Decimal,
    pub damages: Decimal,
    pub other_charges: Decimal,
    pub advance_payment: Decimal,
}

/// Liquidación desglosada guardada en una reserva devuelta
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub days_charged: i64,
    pub distance_traveled: i64,
    pub franchise_km: i64,
    pub franchise_used: i64,
    pub chargeable_distance: i64,
    pub daily_rate: Decimal,
    pub distance_rate: Decimal,
    pub time_charge: Decimal,
    pub distance_charge: Decimal,
    pub wash_cost: Decimal,
    pub fines: Decimal,
    pub damages: Decimal,
    pub other_charges: Decimal,
    pub subtotal: Decimal,
    pub advance_payment: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementKind {
    AmountDue,
    Refund,
}

impl Settlement {
    pub fn kind(&self) -> SettlementKind {
        if self.total.is_sign_negative() && !self.total.is_zero() {
            SettlementKind::Refund
        } else {
            SettlementKind::AmountDue
        }
    }

    /// Importe absoluto a cobrar o a devolver
    pub fn balance(&self) -> Decimal {
        self.total.abs()
    }
}

fn to_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn out_of_range() -> AppError {
    validation_error("settlement", "amounts exceed the supported range")
}

fn mul(a: Decimal, b: Decimal) -> AppResult<Decimal> {
    a.checked_mul(b).ok_or_else(out_of_range)
}

fn sum(values: &[Decimal]) -> AppResult<Decimal> {
    values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
        .ok_or_else(out_of_range)
}

/// Calcular la liquidación de un alquiler.
///
/// Quien llama garantiza `odometer_in >= odometer_out` y
/// `return_date >= start_date`; las guardas del ciclo de vida comprueban ambos.
/// Los importes demasiado grandes para la aritmética decimal exacta son un
/// error de validación.
pub fn settle(input: &SettlementInput) -> AppResult<Settlement> {
    let days_charged = (input.return_date - input.start_date).num_days().max(1);
    let distance_traveled = input.odometer_in - input.odometer_out;

    // Una distancia igual a la franquicia es gratuita
    let chargeable_distance = (distance_traveled - input.franchise_km).max(0);
    let franchise_used = distance_traveled.min(input.franchise_km).max(0);

    let distance_charge = mul(Decimal::from(chargeable_distance), input.distance_rate)?;
    let time_charge = mul(Decimal::from(days_charged), input.daily_rate)?;

    let subtotal = to_cents(sum(&[
        time_charge,
        distance_charge,
        input.wash_cost,
        input.fines,
        input.damages,
        input.other_charges,
    ])?);
    let total = to_cents(
        subtotal
            .checked_sub(input.advance_payment)
            .ok_or_else(out_of_range)?,
    );

    Ok(Settlement {
        days_charged,
        distance_traveled,
        franchise_km: input.franchise_km,
        franchise_used,
        chargeable_distance,
        daily_rate: input.daily_rate,
        distance_rate: input.distance_rate,
        time_charge,
        distance_charge,
        wash_cost: input.wash_cost,
        fines: input.fines,
        damages: input.damages,
        other_charges: input.other_charges,
        subtotal,
        advance_payment: input.advance_payment,
        total,
    })
}
