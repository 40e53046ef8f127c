//! Helpers de validación
//!
//! Comprobaciones de entrada que se ejecutan antes de acceder al ledger.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use validator::ValidationError;

use crate::utils::errors::{validation_error, AppResult};

lazy_static! {
    /// Placas brasileñas: antiguas `ABC1234` / `ABC-1234` y Mercosur `ABC1D23`
    pub static ref PLATE_REGEX: Regex = Regex::new(r"^[A-Z]{3}-?[0-9][A-Z0-9][0-9]{2}$").unwrap();
}

/// Las placas se guardan en mayúsculas sin espacios alrededor
pub fn normalize_plate(value: &str) -> String {
    value.trim().to_uppercase()
}

/// Mayor importe que cabe en una columna `NUMERIC(12, 2)`, en céntimos
const MAX_AMOUNT_CENTS: i64 = 999_999_999_999;

pub fn max_amount() -> Decimal {
    Decimal::new(MAX_AMOUNT_CENTS, 2)
}

fn is_negative(value: Decimal) -> bool {
    value.is_sign_negative() && !value.is_zero()
}

/// Importes y tarifas nunca son negativos y caben en las columnas del ledger
pub fn ensure_amount(field: &'static str, value: Decimal) -> AppResult<()> {
    if is_negative(value) {
        return Err(validation_error(field, "must not be negative"));
    }
    if value > max_amount() {
        return Err(validation_error(field, "exceeds the maximum amount"));
    }
    Ok(())
}

/// Hook de validator para campos decimales de los DTOs de petición
pub fn validate_amount(value: &Decimal) -> Result<(), ValidationError> {
    let code = if is_negative(*value) {
        "non_negative"
    } else if *value > max_amount() {
        "max_amount"
    } else {
        return Ok(());
    };
    let mut error = ValidationError::new(code);
    error.add_param("value".into(), &value.to_string());
    Err(error)
}

/// Validar que un string no esté vacío
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("not_blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plate_formats() {
        assert!(PLATE_REGEX.is_match("ABC1234"));
        assert!(PLATE_REGEX.is_match("ABC-1234"));
        assert!(PLATE_REGEX.is_match("BRA2E19"));
        assert!(!PLATE_REGEX.is_match("abc1234"));
        assert!(!PLATE_REGEX.is_match("AB12345"));
        assert!(!PLATE_REGEX.is_match("ABCD123"));
    }

    #[test]
    fn test_normalize_plate() {
        assert_eq!(normalize_plate("  bra2e19 "), "BRA2E19");
    }

    #[test]
    fn test_ensure_amount() {
        assert!(ensure_amount("advance_payment", Decimal::ZERO).is_ok());
        assert!(ensure_amount("advance_payment", Decimal::new(1050, 2)).is_ok());
        assert!(ensure_amount("advance_payment", max_amount()).is_ok());
        assert!(ensure_amount("advance_payment", Decimal::new(-1, 2)).is_err());
        assert!(ensure_amount("advance_payment", max_amount() + Decimal::new(1, 2)).is_err());
    }

    #[test]
    fn test_validate_amount_codes() {
        assert!(validate_amount(&Decimal::from(100)).is_ok());
        assert_eq!(validate_amount(&Decimal::from(-1)).unwrap_err().code, "non_negative");
        assert_eq!(validate_amount(&Decimal::MAX).unwrap_err().code, "max_amount");
    }

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("Corolla").is_ok());
        assert!(validate_not_blank("   ").is_err());
    }
}
