//! Monetary amounts (pounds sterling, two decimal places).

use core::ops::{Add, Sub};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A monetary amount.
///
/// Arithmetic is exact (`rust_decimal`); rounding happens only where a rule
/// asks for it, always half-up to two decimal places.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Round half-up to pennies (4.995 -> 5.00).
    pub fn round_half_up(self) -> Self {
        Self(round_half_up(self.0, 2))
    }

    /// Clamp to zero from below.
    pub fn non_negative(self) -> Self {
        if self.is_negative() { Self::ZERO } else { self }
    }
}

/// Half-up rounding for positive amounts (half away from zero in general).
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "£{:.2}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_up_to_pennies() {
        assert_eq!(Money::new(dec!(4.995)).round_half_up(), Money::new(dec!(5.00)));
        assert_eq!(Money::new(dec!(4.994)).round_half_up(), Money::new(dec!(4.99)));
        assert_eq!(Money::new(dec!(44.125)).round_half_up(), Money::new(dec!(44.13)));
    }

    #[test]
    fn non_negative_clamps_at_zero() {
        let m = Money::new(dec!(10)) - Money::new(dec!(15));
        assert!(m.is_negative());
        assert_eq!(m.non_negative(), Money::ZERO);
        assert!(!Money::ZERO.is_negative());
    }

    #[test]
    fn displays_in_pounds() {
        assert_eq!(Money::new(dec!(9.5)).to_string(), "£9.50");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            #[test]
            fn rounding_to_pennies_is_stable(units in -10_000_000i64..10_000_000, scale in 0u32..6) {
                let m = Money::new(Decimal::new(units, scale));
                let once = m.round_half_up();
                prop_assert!(once.amount().scale() <= 2);
                prop_assert_eq!(once.round_half_up(), once);
                prop_assert!((once.amount() - m.amount()).abs() <= dec!(0.005));
            }
        }
    }
}
