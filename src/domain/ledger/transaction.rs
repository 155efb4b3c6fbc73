//! Immutable bonus ledger entries.
//!
//! A `BonusTransaction` is written once and never updated. Corrections are
//! new entries of type `ManualAdjustment`. Each entry carries an idempotency
//! key derived from its source event and a snapshot of the calculation
//! inputs, so any historical amount can be re-derived from the entry alone
//! even after tier rates change.

use crate::domain::foundation::{
    BatchId, BonusRate, DomainError, MemberId, Money, Timestamp, TransactionId,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledger entry classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Bonus earned from a trade-in item selling within the tier window.
    TradeInBonus,

    /// Staff-issued correction or goodwill credit.
    ManualAdjustment,

    /// Promotional credit.
    Promotion,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::TradeInBonus => "trade_in_bonus",
            TransactionType::ManualAdjustment => "manual_adjustment",
            TransactionType::Promotion => "promotion",
        }
    }
}

/// Who created the entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "staff_id")]
pub enum Creator {
    /// Written by the bonus-crediting pipeline.
    System,

    /// Written by a named staff account.
    Staff(String),
}

/// Deterministic key guaranteeing at-most-once crediting per source event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Wraps a caller-supplied key.
    pub fn new(key: impl Into<String>) -> Result<Self, DomainError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(DomainError::invariant("idempotency key must not be empty"));
        }
        Ok(Self(key))
    }

    /// Derives the key for a trade-in sale. The same item sold at the same
    /// instant always maps to the same key, so webhook redelivery and
    /// pipeline retries collapse onto one ledger entry.
    pub fn for_trade_in_sale(item_reference: &str, sold_at: Timestamp) -> Self {
        Self(format!(
            "trade_in_sale:{}:{}",
            item_reference,
            sold_at.as_unix_secs()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Audit snapshot of every input that produced the bonus amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationSnapshot {
    pub sale_price: Money,
    pub trade_value: Money,
    pub profit: Money,
    pub bonus_rate: BonusRate,
    pub days_to_sell: u32,
    pub quick_flip_days: u32,
}

/// Immutable bonus ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusTransaction {
    pub id: TransactionId,
    pub member_id: MemberId,

    /// Item the bonus was earned on, when the entry came from a sale.
    pub item_reference: Option<String>,

    /// Batch the item arrived in, for batched store-credit pushes.
    pub batch_id: Option<BatchId>,

    /// Always non-negative. Zero-amount entries are legitimate audit
    /// records for expired-window and no-profit sales.
    pub amount: Money,

    pub transaction_type: TransactionType,
    pub idempotency_key: IdempotencyKey,

    /// Present on calculated entries, absent on manual adjustments.
    pub snapshot: Option<CalculationSnapshot>,

    pub created_at: Timestamp,
    pub created_by: Creator,
}

impl BonusTransaction {
    /// Creates a system-written trade-in bonus entry.
    pub fn trade_in_bonus(
        member_id: MemberId,
        item_reference: String,
        batch_id: Option<BatchId>,
        amount: Money,
        idempotency_key: IdempotencyKey,
        snapshot: CalculationSnapshot,
    ) -> Result<Self, DomainError> {
        Self::build(
            member_id,
            Some(item_reference),
            batch_id,
            amount,
            TransactionType::TradeInBonus,
            idempotency_key,
            Some(snapshot),
            Creator::System,
        )
    }

    /// Creates a staff-written manual adjustment.
    pub fn manual_adjustment(
        member_id: MemberId,
        amount: Money,
        idempotency_key: IdempotencyKey,
        staff_id: impl Into<String>,
    ) -> Result<Self, DomainError> {
        Self::build(
            member_id,
            None,
            None,
            amount,
            TransactionType::ManualAdjustment,
            idempotency_key,
            None,
            Creator::Staff(staff_id.into()),
        )
    }

    /// Creates a promotional credit.
    pub fn promotion(
        member_id: MemberId,
        amount: Money,
        idempotency_key: IdempotencyKey,
        creator: Creator,
    ) -> Result<Self, DomainError> {
        Self::build(
            member_id,
            None,
            None,
            amount,
            TransactionType::Promotion,
            idempotency_key,
            None,
            creator,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        member_id: MemberId,
        item_reference: Option<String>,
        batch_id: Option<BatchId>,
        amount: Money,
        transaction_type: TransactionType,
        idempotency_key: IdempotencyKey,
        snapshot: Option<CalculationSnapshot>,
        created_by: Creator,
    ) -> Result<Self, DomainError> {
        if amount.is_negative() {
            // A negative bonus is never valid input. Corrections that reduce
            // a balance go through the commerce platform, not this ledger.
            return Err(DomainError::invariant(format!(
                "bonus amount must be non-negative, got {}",
                amount
            )));
        }

        Ok(Self {
            id: TransactionId::from_idempotency_key(idempotency_key.as_str()),
            member_id,
            item_reference,
            batch_id,
            amount,
            transaction_type,
            idempotency_key,
            snapshot,
            created_at: Timestamp::now(),
            created_by,
        })
    }
}
