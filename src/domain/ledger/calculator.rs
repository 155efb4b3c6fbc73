//! Pure bonus calculation.
//!
//! `calculate` derives a bonus amount from a sale event and the member's
//! tier at calculation time. It never touches storage; the caller writes
//! the resulting entry under the ledger's idempotency discipline. Expired
//! windows and unprofitable sales still produce a zero-amount result so
//! every sale of a traded-in item leaves an audit record.

use crate::domain::foundation::{BatchId, MemberId, Money, Timestamp};
use crate::domain::tier::Tier;

use super::{CalculationSnapshot, IdempotencyKey};

/// A traded-in item selling through the storefront.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeInSaleEvent {
    pub member_id: MemberId,
    pub item_reference: String,
    pub batch_id: Option<BatchId>,
    pub sale_price: Money,
    pub trade_value: Money,
}

/// Why the calculated amount is what it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BonusOutcome {
    /// Sold within the window at a profit.
    Qualified,

    /// Sold after the tier's quick-flip window closed.
    WindowExpired,

    /// Sale price did not exceed trade value.
    NoProfit,
}

/// Result of a bonus calculation, ready to become a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BonusResult {
    pub amount: Money,
    pub outcome: BonusOutcome,
    pub idempotency_key: IdempotencyKey,
    pub snapshot: CalculationSnapshot,
}

/// Computes the bonus for a sale under the given tier.
///
/// `profit = sale_price - trade_value`. Days to sell is the whole-day
/// difference between receipt and sale, floored at zero. The amount is
/// `profit * tier.bonus_rate` rounded half to even at the cent boundary.
pub fn calculate(
    event: &TradeInSaleEvent,
    tier: &Tier,
    sold_at: Timestamp,
    received_at: Timestamp,
) -> BonusResult {
    let profit = event.sale_price.saturating_sub(event.trade_value);
    let days_to_sell = sold_at.whole_days_since(&received_at);

    let outcome = if !profit.is_positive() {
        BonusOutcome::NoProfit
    } else if days_to_sell > tier.quick_flip_days {
        BonusOutcome::WindowExpired
    } else {
        BonusOutcome::Qualified
    };

    let amount = match outcome {
        BonusOutcome::Qualified => profit.mul_basis_points(tier.bonus_rate),
        BonusOutcome::WindowExpired | BonusOutcome::NoProfit => Money::ZERO,
    };

    BonusResult {
        amount,
        outcome,
        idempotency_key: IdempotencyKey::for_trade_in_sale(&event.item_reference, sold_at),
        snapshot: CalculationSnapshot {
            sale_price: event.sale_price,
            trade_value: event.trade_value,
            profit,
            bonus_rate: tier.bonus_rate,
            days_to_sell,
            quick_flip_days: tier.quick_flip_days,
        },
    }
}
