//! Store-credit gateway decorator adding retry and alerting.
//!
//! Batch credit pushes represent member-owed value, so a transiently
//! unreachable commerce platform gets bounded exponential backoff and a
//! critical alert on exhaustion. Balance reads pass straight through; the
//! inner client already degrades them.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::dashboard::StoreCreditBalance;
use crate::domain::foundation::{BatchId, DomainError, MemberId, Money};
use crate::ports::{Alert, AlertNotifier, StoreCreditGateway};

use super::RetryPolicy;

/// Retrying decorator around a store-credit gateway.
pub struct RetryingStoreCreditGateway {
    inner: Arc<dyn StoreCreditGateway>,
    alerts: Arc<dyn AlertNotifier>,
    policy: RetryPolicy,
}

impl RetryingStoreCreditGateway {
    pub fn new(
        inner: Arc<dyn StoreCreditGateway>,
        alerts: Arc<dyn AlertNotifier>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            inner,
            alerts,
            policy,
        }
    }
}

#[async_trait]
impl StoreCreditGateway for RetryingStoreCreditGateway {
    async fn fetch_balance(
        &self,
        member_id: MemberId,
    ) -> Result<StoreCreditBalance, DomainError> {
        self.inner.fetch_balance(member_id).await
    }

    async fn push_batch_credit(
        &self,
        member_id: MemberId,
        batch_id: BatchId,
        amount: Money,
    ) -> Result<(), DomainError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.inner.push_batch_credit(member_id, batch_id, amount).await {
                Ok(()) => {
                    if attempt > 1 {
                        tracing::info!(%member_id, %batch_id, attempt, "credit push succeeded after retry");
                    }
                    return Ok(());
                }
                Err(err) if err.is_retryable() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(
                        %member_id,
                        %batch_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "credit push failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    if err.is_retryable() {
                        // Retries exhausted; the batch stays Priced and
                        // operators must reconcile manually.
                        self.alerts
                            .notify(Alert::critical(
                                "store_credit_push_failed",
                                format!(
                                    "failed to push {} for member {} batch {} after {} attempts: {}",
                                    amount, member_id, batch_id, attempt, err
                                ),
                            ))
                            .await;
                    }
                    return Err(err);
                }
            }
        }
    }
}
