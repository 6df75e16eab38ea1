// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Money helpers: minor-unit rounding and the fixed-point storage encoding.
//!
//! Amounts are [`Decimal`] in the domain and integer hundredths ("cents") in
//! the ledger store, regardless of currency.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::TutorError;

/// Number of decimal places amounts in `currency` are settled with.
///
/// Mobile-money currencies settle in whole units.
pub fn minor_units(currency: &str) -> u32 {
    match currency.to_ascii_uppercase().as_str() {
        "KES" | "UGX" | "TZS" | "RWF" | "JPY" => 0,
        _ => 2,
    }
}

/// Round `amount` half-to-even on the minor unit of `currency`.
pub fn round_to_currency(amount: Decimal, currency: &str) -> Decimal {
    amount.round_dp_with_strategy(minor_units(currency), RoundingStrategy::MidpointNearestEven)
}

/// Convert `amount` from `from` to `to` given both currencies' rates against
/// a common base, rounding half-to-even on the target minor unit.
pub fn convert(
    amount: Decimal,
    from_rate: Decimal,
    to_rate: Decimal,
    to_currency: &str,
) -> Result<Decimal, TutorError> {
    if from_rate <= Decimal::ZERO || to_rate <= Decimal::ZERO {
        return Err(TutorError::Conversion(format!(
            "non-positive exchange rate ({from_rate} -> {to_rate})"
        )));
    }
    let converted = amount
        .checked_mul(to_rate)
        .and_then(|v| v.checked_div(from_rate))
        .ok_or_else(|| TutorError::Conversion("amount overflow during conversion".into()))?;
    Ok(round_to_currency(converted, to_currency))
}

/// Encode an amount as integer hundredths for storage.
pub fn to_cents(amount: Decimal) -> Result<i64, TutorError> {
    let scaled = amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or_else(|| TutorError::InvalidInput(format!("amount {amount} out of range")))?;
    if scaled.fract() != Decimal::ZERO {
        return Err(TutorError::InvalidInput(format!(
            "amount {amount} has more than two decimal places"
        )));
    }
    scaled
        .to_i64()
        .ok_or_else(|| TutorError::InvalidInput(format!("amount {amount} out of range")))
}

/// Decode integer hundredths into an amount with scale 2.
pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Teacher earnings for a completed booking: `price * (1 - commission_rate)`,
/// rounded half-to-even to cents.
pub fn net_of_commission(price: Decimal, commission_rate: Decimal) -> Decimal {
    (price * (Decimal::ONE - commission_rate))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn kes_rounds_half_to_even_on_whole_units() {
        assert_eq!(round_to_currency(dec!(2580.5), "KES"), dec!(2580));
        assert_eq!(round_to_currency(dec!(2581.5), "KES"), dec!(2582));
        assert_eq!(round_to_currency(dec!(2581.49), "kes"), dec!(2581));
    }

    #[test]
    fn usd_rounds_half_to_even_on_cents() {
        assert_eq!(round_to_currency(dec!(10.125), "USD"), dec!(10.12));
        assert_eq!(round_to_currency(dec!(10.135), "USD"), dec!(10.14));
    }

    #[test]
    fn convert_usd_to_kes() {
        let kes = convert(dec!(20.00), Decimal::ONE, dec!(129.025), "KES").unwrap();
        assert_eq!(kes, dec!(2580));
    }

    #[test]
    fn convert_rejects_zero_rate() {
        let err = convert(dec!(1), Decimal::ZERO, dec!(1), "USD").unwrap_err();
        assert!(matches!(err, TutorError::Conversion(_)));
    }

    #[test]
    fn cents_encoding() {
        assert_eq!(to_cents(dec!(15.00)).unwrap(), 1500);
        assert_eq!(to_cents(dec!(2580)).unwrap(), 258_000);
        assert_eq!(from_cents(500), dec!(5.00));
        assert!(to_cents(dec!(0.001)).is_err());
    }

    #[test]
    fn commission_is_deducted_once() {
        assert_eq!(net_of_commission(dec!(15.00), dec!(0.20)), dec!(12.00));
        assert_eq!(net_of_commission(dec!(9.99), dec!(0.15)), dec!(8.49));
    }

    proptest::proptest! {
        #[test]
        fn cents_encoding_is_lossless_for_two_decimals(cents in -1_000_000_000i64..1_000_000_000i64) {
            proptest::prop_assert_eq!(to_cents(from_cents(cents)).unwrap(), cents);
        }
    }
}
