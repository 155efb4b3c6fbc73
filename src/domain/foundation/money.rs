//! Money and bonus-rate value objects.
//!
//! All monetary values are i64 minor units (cents), never floats. Bonus rates
//! are basis points, so `profit * rate` stays in integer arithmetic and the
//! only rounding happens once, at the minor-unit boundary, using banker's
//! rounding (round half to even) to avoid systematic bias across batches.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

use super::ValidationError;

/// Monetary amount in minor units (cents), always USD in this program.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a money value from minor units (cents).
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the amount in minor units.
    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Saturating difference, used for profit calculations where the
    /// sign matters but overflow never legitimately occurs.
    pub fn saturating_sub(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0))
    }

    /// Multiplies by a basis-point rate, rounding half to even.
    ///
    /// The intermediate product is computed in i128 so no realistic amount
    /// can overflow. Example: $150.00 at 6000 bp (0.6) yields $90.00 exactly.
    pub fn mul_basis_points(self, rate: BonusRate) -> Money {
        let numerator = (self.0 as i128) * (rate.basis_points() as i128);
        let quotient = numerator.div_euclid(10_000);
        let remainder = numerator.rem_euclid(10_000);

        let rounded = match remainder.cmp(&5_000) {
            std::cmp::Ordering::Less => quotient,
            std::cmp::Ordering::Greater => quotient + 1,
            std::cmp::Ordering::Equal => {
                if quotient % 2 == 0 {
                    quotient
                } else {
                    quotient + 1
                }
            }
        };

        Money(rounded as i64)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money(self.0 - other.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}${}.{:02}", sign, abs / 100, abs % 100)
    }
}

/// Bonus rate in basis points (1/100th of a percent).
///
/// 6000 basis points = 0.6 = 60% of profit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BonusRate(u32);

impl BonusRate {
    /// Maximum supported rate: 100% of profit.
    pub const MAX_BASIS_POINTS: u32 = 10_000;

    /// Creates a rate from basis points.
    ///
    /// # Errors
    ///
    /// Returns an error if the rate exceeds 100%.
    pub fn from_basis_points(bp: u32) -> Result<Self, ValidationError> {
        if bp > Self::MAX_BASIS_POINTS {
            return Err(ValidationError::out_of_range(
                "bonus_rate",
                0,
                Self::MAX_BASIS_POINTS as i32,
                bp as i32,
            ));
        }
        Ok(Self(bp))
    }

    pub fn basis_points(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a display fraction, e.g. "0.60".
    pub fn as_fraction_string(&self) -> String {
        format!("{}.{:02}", self.0 / 10_000, (self.0 % 10_000) / 100)
    }
}

impl fmt::Display for BonusRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}bp", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rate(bp: u32) -> BonusRate {
        BonusRate::from_basis_points(bp).unwrap()
    }

    #[test]
    fn display_formats_dollars_and_cents() {
        assert_eq!(Money::from_cents(9000).to_string(), "$90.00");
        assert_eq!(Money::from_cents(105).to_string(), "$1.05");
        assert_eq!(Money::from_cents(-250).to_string(), "-$2.50");
    }

    #[test]
    fn spec_scenario_sixty_percent_of_150_dollars() {
        // $250 sale - $100 trade value = $150 profit; 0.6 rate -> $90.00
        let profit = Money::from_cents(25_000) - Money::from_cents(10_000);
        assert_eq!(profit, Money::from_cents(15_000));
        assert_eq!(profit.mul_basis_points(rate(6_000)), Money::from_cents(9_000));
    }

    #[test]
    fn rounds_half_to_even_downward() {
        // 25 cents * 50% = 12.5 -> rounds to 12 (even)
        assert_eq!(
            Money::from_cents(25).mul_basis_points(rate(5_000)),
            Money::from_cents(12)
        );
    }

    #[test]
    fn rounds_half_to_even_upward() {
        // 27 cents * 50% = 13.5 -> rounds to 14 (even)
        assert_eq!(
            Money::from_cents(27).mul_basis_points(rate(5_000)),
            Money::from_cents(14)
        );
    }

    #[test]
    fn rounds_normally_when_not_at_midpoint() {
        // 100 * 0.3333 = 33.33 -> 33
        assert_eq!(
            Money::from_cents(100).mul_basis_points(rate(3_333)),
            Money::from_cents(33)
        );
        // 100 * 0.6667 = 66.67 -> 67
        assert_eq!(
            Money::from_cents(100).mul_basis_points(rate(6_667)),
            Money::from_cents(67)
        );
    }

    #[test]
    fn full_rate_is_identity() {
        assert_eq!(
            Money::from_cents(12_345).mul_basis_points(rate(10_000)),
            Money::from_cents(12_345)
        );
    }

    #[test]
    fn rate_rejects_more_than_100_percent() {
        assert!(BonusRate::from_basis_points(10_001).is_err());
    }

    #[test]
    fn rate_fraction_string() {
        assert_eq!(rate(6_000).as_fraction_string(), "0.60");
        assert_eq!(rate(10_000).as_fraction_string(), "1.00");
    }

    #[test]
    fn sum_over_iterator() {
        let total: Money = [Money::from_cents(100), Money::from_cents(250)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::from_cents(350));
    }

    proptest! {
        #[test]
        fn bonus_never_exceeds_profit(cents in 0i64..10_000_000, bp in 0u32..=10_000) {
            let profit = Money::from_cents(cents);
            let bonus = profit.mul_basis_points(rate(bp));
            // Rounding can add at most half a cent, which the <= holds for
            // because the rate is at most 100%.
            prop_assert!(bonus.cents() <= profit.cents() + 1);
            prop_assert!(bonus.cents() >= 0);
        }

        #[test]
        fn rounding_error_is_bounded(cents in 0i64..10_000_000, bp in 0u32..=10_000) {
            let exact = (cents as i128) * (bp as i128);
            let rounded = Money::from_cents(cents).mul_basis_points(rate(bp)).cents() as i128;
            let diff = (rounded * 10_000 - exact).abs();
            prop_assert!(diff <= 5_000);
        }
    }
}
