//! Aggregated member dashboard view.
//!
//! Best-effort read composition. Any field other than the member record may
//! carry a documented default when its upstream fetch failed; the aggregator
//! logs the failure instead of surfacing it.

use crate::domain::foundation::Money;
use crate::domain::ledger::BonusTransaction;
use crate::domain::member::{Member, Subscription};
use crate::domain::trade_in::TradeInBatch;
use serde::{Deserialize, Serialize};

/// Read-through view of the balance held by the commerce platform.
///
/// Never authoritative here. `stale` is set when the fetch failed and the
/// amount is a last-known or zero default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCreditBalance {
    pub amount: Money,
    pub currency: String,
    pub stale: bool,
}

impl StoreCreditBalance {
    pub fn fresh(amount: Money, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
            stale: false,
        }
    }

    /// Fallback when no balance could be fetched and none is cached.
    pub fn unknown() -> Self {
        Self {
            amount: Money::ZERO,
            currency: "USD".to_string(),
            stale: true,
        }
    }

    /// Marks a previously fetched balance as stale.
    pub fn into_stale(mut self) -> Self {
        self.stale = true;
        self
    }
}

/// Everything the member dashboard shows, composed in one read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberDashboard {
    pub member: Member,
    pub subscription: Option<Subscription>,

    /// Most recent ledger entries, newest first. Empty on fetch failure.
    pub recent_bonuses: Vec<BonusTransaction>,

    /// Lifetime bonus total recomputed from the ledger. Zero on failure.
    pub total_bonus: Money,

    /// Most recent trade-in batches, newest first. Empty on fetch failure.
    pub recent_batches: Vec<TradeInBatch>,

    pub store_credit: StoreCreditBalance,

    /// True when any sub-fetch fell back to its default.
    pub degraded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_balance_is_zero_and_stale() {
        let balance = StoreCreditBalance::unknown();
        assert_eq!(balance.amount, Money::ZERO);
        assert!(balance.stale);
    }

    #[test]
    fn into_stale_keeps_amount() {
        let balance = StoreCreditBalance::fresh(Money::from_cents(4_200), "USD").into_stale();
        assert_eq!(balance.amount, Money::from_cents(4_200));
        assert!(balance.stale);
    }
}
