//! CreditTradeInSaleHandler - turns a sale event into a ledger entry.
//!
//! The commerce platform delivers sale events at least once; the ledger's
//! idempotency key makes the second and later deliveries collapse into
//! `Duplicate`. Zero-amount entries (expired window, no profit) are written
//! too, so the audit trail has no silent gaps.

use std::sync::Arc;

use crate::domain::foundation::{BatchId, MemberId, Money, Timestamp};
use crate::domain::ledger::{calculate, BonusOutcome, BonusTransaction, TradeInSaleEvent};
use crate::domain::member::{MemberError, MemberStatus, PastDuePolicy};
use crate::ports::{AppendOutcome, LedgerStore, MemberRepository, TierRegistry};

/// Command describing a traded-in item that sold.
#[derive(Debug, Clone)]
pub struct CreditTradeInSaleCommand {
    pub member_id: MemberId,
    pub item_reference: String,
    pub batch_id: Option<BatchId>,
    pub sale_price: Money,
    pub trade_value: Money,
    pub sold_at: Timestamp,
    pub received_at: Timestamp,
}

/// Result of crediting one sale.
#[derive(Debug, Clone)]
pub struct CreditTradeInSaleResult {
    pub transaction: BonusTransaction,
    pub outcome: AppendOutcome,
    pub bonus_outcome: BonusOutcome,
}

/// Handler for crediting trade-in sales.
pub struct CreditTradeInSaleHandler {
    members: Arc<dyn MemberRepository>,
    tiers: Arc<dyn TierRegistry>,
    ledger: Arc<dyn LedgerStore>,
    past_due_policy: PastDuePolicy,
}

impl CreditTradeInSaleHandler {
    pub fn new(
        members: Arc<dyn MemberRepository>,
        tiers: Arc<dyn TierRegistry>,
        ledger: Arc<dyn LedgerStore>,
        past_due_policy: PastDuePolicy,
    ) -> Self {
        Self {
            members,
            tiers,
            ledger,
            past_due_policy,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreditTradeInSaleCommand,
    ) -> Result<CreditTradeInSaleResult, MemberError> {
        let member = self
            .members
            .find_by_id(cmd.member_id)
            .await?
            .ok_or_else(|| MemberError::not_found(cmd.member_id))?;

        let tier_id = member.tier_id.ok_or_else(|| {
            MemberError::validation("member_id", "member has no assigned tier")
        })?;
        // Tier versions are immutable, so resolving by the member's current
        // reference gives exactly the rate in force when the sale lands.
        let tier = self
            .tiers
            .get(tier_id)
            .await
            .map_err(|_| MemberError::tier_not_found(tier_id))?;

        let event = TradeInSaleEvent {
            member_id: member.id,
            item_reference: cmd.item_reference,
            batch_id: cmd.batch_id,
            sale_price: cmd.sale_price,
            trade_value: cmd.trade_value,
        };
        let mut result = calculate(&event, &tier, cmd.sold_at, cmd.received_at);

        let suspended = self.past_due_policy == PastDuePolicy::SuspendCrediting
            && member.status == MemberStatus::PastDue;
        if suspended {
            result.amount = Money::ZERO;
        }

        let transaction = BonusTransaction::trade_in_bonus(
            member.id,
            event.item_reference,
            event.batch_id,
            result.amount,
            result.idempotency_key.clone(),
            result.snapshot.clone(),
        )?;

        let outcome = self.ledger.append(&transaction).await?;

        tracing::info!(
            member_id = %member.id,
            item = %transaction.item_reference.as_deref().unwrap_or(""),
            amount = %transaction.amount,
            outcome = ?result.outcome,
            duplicate = outcome.is_duplicate(),
            suspended,
            "trade-in sale credited"
        );

        Ok(CreditTradeInSaleResult {
            transaction,
            outcome,
            bonus_outcome: result.outcome,
        })
    }
}
