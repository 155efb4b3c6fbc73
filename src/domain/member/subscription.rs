//! Subscription entity linking a member to the payment processor.
//!
//! A subscription belongs to exactly one member and holds the processor-side
//! identifiers and billing period. It is created when a member completes tier
//! selection and payment setup, and updated only by the reconciliation layer
//! in response to processor events or explicit member actions.

use crate::domain::foundation::{DomainError, MemberId, SubscriptionId, Timestamp};
use serde::{Deserialize, Serialize};

/// Payment status as tracked against the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Checkout started, first payment not yet confirmed.
    Pending,

    /// Most recent invoice paid.
    Paid,

    /// Most recent payment attempt failed.
    Failed,

    /// Subscription terminated at the processor.
    Canceled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Canceled => "canceled",
        }
    }
}

/// Subscription record for a member.
///
/// # Invariants
///
/// - `current_period_start <= current_period_end`
/// - `processor_subscription_id` is set once payment is confirmed and never
///   cleared except by full upstream termination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub member_id: MemberId,

    /// Processor customer id (e.g. `cus_...`).
    pub processor_customer_id: String,

    /// Processor subscription id (e.g. `sub_...`); absent until the first
    /// payment is confirmed.
    pub processor_subscription_id: Option<String>,

    pub payment_status: PaymentStatus,
    pub current_period_start: Timestamp,
    pub current_period_end: Timestamp,

    /// When true the subscription stays active until the period boundary,
    /// then cancels.
    pub cancel_at_period_end: bool,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Creates a pending subscription when checkout starts.
    pub fn start_checkout(
        id: SubscriptionId,
        member_id: MemberId,
        processor_customer_id: String,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            member_id,
            processor_customer_id,
            processor_subscription_id: None,
            payment_status: PaymentStatus::Pending,
            current_period_start: now,
            current_period_end: now, // set when payment is confirmed
            cancel_at_period_end: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Records confirmed payment setup from a verified processor callback.
    pub fn confirm(
        &mut self,
        processor_subscription_id: String,
        period_start: Timestamp,
        period_end: Timestamp,
    ) -> Result<(), DomainError> {
        if period_end.is_before(&period_start) {
            return Err(DomainError::invariant(format!(
                "billing period end {} precedes start {}",
                period_end, period_start
            )));
        }
        self.processor_subscription_id = Some(processor_subscription_id);
        self.payment_status = PaymentStatus::Paid;
        self.current_period_start = period_start;
        self.current_period_end = period_end;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Records a failed payment notification.
    pub fn mark_failed(&mut self) {
        self.payment_status = PaymentStatus::Failed;
        self.updated_at = Timestamp::now();
    }

    /// Records a successful billing attempt (renewal or past-due recovery).
    pub fn record_payment(&mut self, period_start: Timestamp, period_end: Timestamp) {
        self.payment_status = PaymentStatus::Paid;
        self.current_period_start = period_start;
        self.current_period_end = period_end;
        self.updated_at = Timestamp::now();
    }

    /// Schedules cancellation at the end of the current period.
    pub fn schedule_cancel(&mut self) {
        self.cancel_at_period_end = true;
        self.updated_at = Timestamp::now();
    }

    /// Cancels immediately.
    pub fn cancel_now(&mut self) {
        self.payment_status = PaymentStatus::Canceled;
        self.cancel_at_period_end = false;
        self.updated_at = Timestamp::now();
    }

    /// Clears a scheduled cancellation (reactivation before the boundary).
    pub fn clear_scheduled_cancel(&mut self) {
        self.cancel_at_period_end = false;
        self.updated_at = Timestamp::now();
    }

    /// True once the processor has fully terminated the subscription, at
    /// which point reactivation requires a fresh tier selection.
    pub fn is_terminated(&self) -> bool {
        self.payment_status == PaymentStatus::Canceled
    }
}
