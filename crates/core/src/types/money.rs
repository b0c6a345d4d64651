//! Money conversion helpers.
//!
//! Prices are carried as [`rust_decimal::Decimal`] throughout; the payment
//! gateway speaks in the smallest currency subunit (e.g. paise for INR).

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Convert an amount in standard currency units to minor units (1/100).
///
/// The amount is rounded to two decimal places (banker's rounding) before
/// conversion, so `12.345` becomes `1234` or `1235` never `1234.5`.
/// Returns `None` if the result does not fit in an `i64`.
#[must_use]
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (amount.round_dp(2) * Decimal::ONE_HUNDRED).to_i64()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_amounts() {
        assert_eq!(to_minor_units(Decimal::ZERO), Some(0));
        assert_eq!(to_minor_units(Decimal::from(499)), Some(49_900));
        assert_eq!(to_minor_units(Decimal::from(129_900)), Some(12_990_000));
    }

    #[test]
    fn test_fractional_amounts() {
        assert_eq!(to_minor_units(Decimal::new(1999, 2)), Some(1999));
        assert_eq!(to_minor_units(Decimal::new(1, 2)), Some(1));
    }

    #[test]
    fn test_rounds_to_two_places() {
        // banker's rounding at two decimal places
        assert_eq!(to_minor_units(Decimal::new(1005, 3)), Some(100));
        assert_eq!(to_minor_units(Decimal::new(1015, 3)), Some(102));
    }

    #[test]
    fn test_overflow_returns_none() {
        assert_eq!(to_minor_units(Decimal::MAX), None);
    }
}
