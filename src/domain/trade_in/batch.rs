//! Trade-in batch aggregate.

use crate::domain::foundation::{
    BatchId, DomainError, ErrorCode, MemberId, Money, StateMachine, Timestamp, ValidationError,
};
use serde::{Deserialize, Serialize};

/// Lifecycle of a trade-in batch.
///
/// `Credited` is terminal and is only entered once every eligible item's
/// bonus has been durably recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Items received, awaiting pricing.
    Pending,

    /// All items priced; trade value is final.
    Priced,

    /// All eligible bonuses recorded and pushed as store credit.
    Credited,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Priced => "priced",
            BatchStatus::Credited => "credited",
        }
    }
}

impl StateMachine for BatchStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        matches!(
            (self, target),
            (BatchStatus::Pending, BatchStatus::Priced)
                | (BatchStatus::Priced, BatchStatus::Credited)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        match self {
            BatchStatus::Pending => vec![BatchStatus::Priced],
            BatchStatus::Priced => vec![BatchStatus::Credited],
            BatchStatus::Credited => vec![],
        }
    }
}

/// A group of trade-in items submitted together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeInBatch {
    pub id: BatchId,
    pub member_id: MemberId,

    /// Human-readable reference printed on the intake receipt.
    pub reference_code: String,

    pub status: BatchStatus,
    pub item_count: u32,

    /// Total trade value across items, final once `Priced`.
    pub trade_value: Money,

    pub received_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TradeInBatch {
    /// Records a batch at intake, before pricing.
    pub fn receive(
        id: BatchId,
        member_id: MemberId,
        reference_code: impl Into<String>,
        item_count: u32,
        received_at: Timestamp,
    ) -> Result<Self, ValidationError> {
        let reference_code = reference_code.into();
        if reference_code.trim().is_empty() {
            return Err(ValidationError::empty_field("reference_code"));
        }
        if item_count == 0 {
            return Err(ValidationError::out_of_range("item_count", 1, i32::MAX, 0));
        }

        let now = Timestamp::now();
        Ok(Self {
            id,
            member_id,
            reference_code,
            status: BatchStatus::Pending,
            item_count,
            trade_value: Money::ZERO,
            received_at,
            created_at: now,
            updated_at: now,
        })
    }

    /// Finalizes pricing for the batch.
    pub fn price(&mut self, trade_value: Money) -> Result<(), DomainError> {
        if trade_value.is_negative() {
            return Err(DomainError::invariant(format!(
                "batch trade value must be non-negative, got {}",
                trade_value
            )));
        }
        self.transition_to(BatchStatus::Priced)?;
        self.trade_value = trade_value;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Marks the batch credited. The caller must have durably recorded a
    /// ledger entry for every eligible item first.
    pub fn mark_credited(&mut self) -> Result<(), DomainError> {
        self.transition_to(BatchStatus::Credited)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    fn transition_to(&mut self, target: BatchStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition batch from {} to {}",
                    self.status.as_str(),
                    target.as_str()
                ),
            )
        })?;
        Ok(())
    }
}
