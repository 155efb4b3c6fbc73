//! CreditBatchHandler - pushes a batch's bonus total as store credit.
//!
//! One external call per trade-in batch rather than per transaction. The
//! batch only reaches `Credited` after the push succeeds; a failed push
//! leaves it `Priced` so the operation can be retried, and the wired
//! gateway alerts when its retries are exhausted.

use std::sync::Arc;

use crate::domain::foundation::{BatchId, Money};
use crate::domain::member::MemberError;
use crate::domain::trade_in::{BatchStatus, TradeInBatch};
use crate::ports::{LedgerStore, StoreCreditGateway, TradeInRepository};

/// Command to push one batch's credited total.
#[derive(Debug, Clone)]
pub struct CreditBatchCommand {
    pub batch_id: BatchId,
}

/// Result of a successful batch credit.
#[derive(Debug, Clone)]
pub struct CreditBatchResult {
    pub batch: TradeInBatch,
    pub amount_pushed: Money,
}

/// Handler for batch store-credit pushes.
pub struct CreditBatchHandler {
    trade_ins: Arc<dyn TradeInRepository>,
    ledger: Arc<dyn LedgerStore>,
    store_credit: Arc<dyn StoreCreditGateway>,
}

impl CreditBatchHandler {
    pub fn new(
        trade_ins: Arc<dyn TradeInRepository>,
        ledger: Arc<dyn LedgerStore>,
        store_credit: Arc<dyn StoreCreditGateway>,
    ) -> Self {
        Self {
            trade_ins,
            ledger,
            store_credit,
        }
    }

    pub async fn handle(&self, cmd: CreditBatchCommand) -> Result<CreditBatchResult, MemberError> {
        let mut batch = self
            .trade_ins
            .find_by_id(cmd.batch_id)
            .await?
            .ok_or_else(|| {
                MemberError::validation("batch_id", format!("batch {} not found", cmd.batch_id))
            })?;

        if batch.status != BatchStatus::Priced {
            return Err(MemberError::invalid_state(
                batch.status.as_str(),
                "credit batch",
            ));
        }

        // The total comes from the ledger, never from a running counter.
        let amount = self.ledger.sum_by_batch(batch.id).await?;

        // Push is idempotent on (member, batch) at the gateway, so a retry
        // after a crash between push and update is safe.
        self.store_credit
            .push_batch_credit(batch.member_id, batch.id, amount)
            .await?;

        batch.mark_credited()?;
        self.trade_ins.update(&batch).await?;

        tracing::info!(
            batch_id = %batch.id,
            member_id = %batch.member_id,
            amount = %amount,
            "batch store credit pushed"
        );

        Ok(CreditBatchResult {
            batch,
            amount_pushed: amount,
        })
    }
}
