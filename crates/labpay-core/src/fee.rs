//! Marketplace Fee Policy
//!
//! Pure fee computation: either a fixed override or a percentage of the unit
//! price, always in integer minor units.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;

/// Marketplace share applied when no explicit configuration is given.
pub const DEFAULT_FEE_PERCENT: Decimal = dec!(0.18);

/// Marketplace fee configuration.
///
/// [`FeePolicy::fee_for`] is pure and deterministic for a given policy; the
/// fee is computed once per checkout session and never re-derived afterward.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeePolicy {
    /// Fraction of the unit amount retained by the marketplace
    percent: Decimal,

    /// Fixed fee in minor units; wins over the percentage when set
    fixed_cents: Option<i64>,
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self::percentage(DEFAULT_FEE_PERCENT)
    }
}

impl FeePolicy {
    /// Percentage-based policy. Negative rates are clamped to zero.
    pub fn percentage(percent: Decimal) -> Self {
        Self {
            percent: percent.max(Decimal::ZERO),
            fixed_cents: None,
        }
    }

    /// Fixed-amount policy; the unit amount is ignored entirely.
    pub fn fixed(cents: i64) -> Self {
        Self {
            percent: Decimal::ZERO,
            fixed_cents: Some(cents),
        }
    }

    /// Marketplace fee for one unit, in minor currency units.
    ///
    /// A configured fixed fee is returned unconditionally (clamped to zero).
    /// Otherwise the percentage of the unit amount, rounded half to even.
    /// Non-positive unit amounts yield a zero fee.
    pub fn fee_for(&self, unit_amount_cents: i64) -> i64 {
        if let Some(fixed) = self.fixed_cents {
            return fixed.max(0);
        }
        if unit_amount_cents <= 0 {
            return 0;
        }
        (Decimal::from(unit_amount_cents) * self.percent)
            .round()
            .to_i64()
            .unwrap_or(0)
            .max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_is_deterministic() {
        let policy = FeePolicy::default();
        assert_eq!(policy.fee_for(10000), 1800);
        assert_eq!(policy.fee_for(10000), 1800);
        assert_eq!(policy.fee_for(15000), 2700);
    }

    #[test]
    fn test_zero_and_negative_amounts() {
        let policy = FeePolicy::default();
        assert_eq!(policy.fee_for(0), 0);
        assert_eq!(policy.fee_for(-500), 0);
    }

    #[test]
    fn test_rounds_half_to_even() {
        let policy = FeePolicy::default();
        // 25 * 0.18 = 4.5 -> 4, 75 * 0.18 = 13.5 -> 14
        assert_eq!(policy.fee_for(25), 4);
        assert_eq!(policy.fee_for(75), 14);
    }

    #[test]
    fn test_fixed_override_wins_for_any_amount() {
        let policy = FeePolicy::fixed(500);
        assert_eq!(policy.fee_for(0), 500);
        assert_eq!(policy.fee_for(100), 500);
        assert_eq!(policy.fee_for(1_000_000), 500);
    }

    #[test]
    fn test_fixed_override_clamped_to_zero() {
        let policy = FeePolicy::fixed(-100);
        assert_eq!(policy.fee_for(10000), 0);
    }

    #[test]
    fn test_negative_rate_clamped() {
        let policy = FeePolicy::percentage(dec!(-0.10));
        assert_eq!(policy.fee_for(10000), 0);
    }
}
