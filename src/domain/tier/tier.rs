//! Immutable, versioned membership tier.
//!
//! A tier is frozen once any ledger entry references it: rate or window
//! changes allocate a new version (and a new `TierId`) instead of mutating
//! the existing row, so historical bonus calculations stay reproducible
//! after a rate change.

use crate::domain::foundation::{BonusRate, Money, TierId, ValidationError};
use serde::{Deserialize, Serialize};

/// Structured benefit flags attached to a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TierBenefits {
    /// Early access to new inventory drops.
    pub early_access: bool,

    /// Free shipping on store orders.
    pub free_shipping: bool,

    /// Invitations to members-only events.
    pub exclusive_events: bool,
}

/// A single immutable version of a membership tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub id: TierId,

    /// Version number within the tier's lineage, starting at 1.
    pub version: u32,

    pub name: String,
    pub monthly_price: Money,

    /// Fraction of trade-in profit credited as bonus, in basis points.
    pub bonus_rate: BonusRate,

    /// Days after receipt within which a sale still earns the bonus.
    pub quick_flip_days: u32,

    pub benefits: TierBenefits,

    /// Inactive tiers are hidden from selection but stay resolvable for
    /// historical ledger entries.
    pub active: bool,
}

impl Tier {
    /// Creates the first version of a tier.
    pub fn new(
        id: TierId,
        name: impl Into<String>,
        monthly_price: Money,
        bonus_rate: BonusRate,
        quick_flip_days: u32,
        benefits: TierBenefits,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        if monthly_price.is_negative() {
            return Err(ValidationError::out_of_range(
                "monthly_price",
                0,
                i32::MAX,
                monthly_price.cents() as i32,
            ));
        }

        Ok(Self {
            id,
            version: 1,
            name,
            monthly_price,
            bonus_rate,
            quick_flip_days,
            benefits,
            active: true,
        })
    }

    /// Produces the next version of this tier with updated economics.
    ///
    /// The caller supplies the freshly allocated id; the predecessor should
    /// be deactivated by the registry in the same write.
    pub fn next_version(
        &self,
        new_id: TierId,
        monthly_price: Money,
        bonus_rate: BonusRate,
        quick_flip_days: u32,
    ) -> Self {
        Self {
            id: new_id,
            version: self.version + 1,
            name: self.name.clone(),
            monthly_price,
            bonus_rate,
            quick_flip_days,
            benefits: self.benefits,
            active: true,
        }
    }

    /// Marks this version as no longer offered.
    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gold() -> Tier {
        Tier::new(
            TierId::new(1),
            "Gold",
            Money::from_cents(1_999),
            BonusRate::from_basis_points(6_000).unwrap(),
            14,
            TierBenefits {
                early_access: true,
                free_shipping: true,
                exclusive_events: false,
            },
        )
        .unwrap()
    }

    #[test]
    fn new_tier_starts_at_version_one_and_active() {
        let tier = gold();
        assert_eq!(tier.version, 1);
        assert!(tier.active);
    }

    #[test]
    fn new_tier_rejects_blank_name() {
        let result = Tier::new(
            TierId::new(1),
            "  ",
            Money::from_cents(999),
            BonusRate::from_basis_points(1_000).unwrap(),
            7,
            TierBenefits::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn next_version_increments_and_keeps_name() {
        let v1 = gold();
        let v2 = v1.next_version(
            TierId::new(5),
            Money::from_cents(2_499),
            BonusRate::from_basis_points(6_500).unwrap(),
            21,
        );

        assert_eq!(v2.version, 2);
        assert_eq!(v2.name, "Gold");
        assert_eq!(v2.id, TierId::new(5));
        assert_eq!(v2.quick_flip_days, 21);
        // Predecessor is untouched; the registry deactivates it.
        assert!(v1.active);
        assert_eq!(v1.bonus_rate.basis_points(), 6_000);
    }

    #[test]
    fn deactivate_hides_tier() {
        let mut tier = gold();
        tier.deactivate();
        assert!(!tier.active);
    }
}
