//! Membership lifecycle state machine.
//!
//! Defines all member states and the valid transitions between them. The
//! load-bearing rule: the only way into `Active` from `PendingPayment` is a
//! confirmed payment-setup callback from the reconciliation layer — a member
//! can never self-declare active by navigating the client.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Membership lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    /// Account exists but no tier chosen yet.
    PendingTierSelection,

    /// Tier chosen; awaiting verified payment setup.
    PendingPayment,

    /// Paid-up member with full benefits.
    Active,

    /// Payment failed; tier retained, access limited per merchant policy.
    PastDue,

    /// Membership canceled. Reactivation is possible while the processor
    /// subscription still exists; otherwise a fresh tier selection is needed.
    Canceled,
}

impl MemberStatus {
    /// Returns true if the member currently holds a paid (or grace-period)
    /// membership.
    pub fn is_subscribed(&self) -> bool {
        matches!(self, MemberStatus::Active | MemberStatus::PastDue)
    }

    /// Stable string form used by persistence and wire formats.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::PendingTierSelection => "pending_tier_selection",
            MemberStatus::PendingPayment => "pending_payment",
            MemberStatus::Active => "active",
            MemberStatus::PastDue => "past_due",
            MemberStatus::Canceled => "canceled",
        }
    }
}

/// Policy applied to bonus crediting while a member is past due.
///
/// Product has not committed to a default, so the choice is configuration
/// rather than code. `ContinueCrediting` matches the grace-period reading
/// of past due and is the shipped default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PastDuePolicy {
    /// Past-due members keep earning bonuses.
    #[default]
    ContinueCrediting,

    /// Sales during past due record zero-amount audit entries only.
    SuspendCrediting,
}

impl StateMachine for MemberStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use MemberStatus::*;
        matches!(
            (self, target),
            // From PENDING_TIER_SELECTION
            (PendingTierSelection, PendingPayment)
            // From PENDING_PAYMENT
                | (PendingPayment, Active)
                | (PendingPayment, PendingTierSelection) // abandoned checkout, re-select
            // From ACTIVE
                | (Active, Active) // tier change / renewal
                | (Active, PastDue)
                | (Active, Canceled)
            // From PAST_DUE
                | (PastDue, Active) // billing recovered
                | (PastDue, Canceled)
            // From CANCELED
                | (Canceled, Active) // reactivate before upstream termination
                | (Canceled, PendingTierSelection) // fresh start after termination
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use MemberStatus::*;
        match self {
            PendingTierSelection => vec![PendingPayment],
            PendingPayment => vec![Active, PendingTierSelection],
            Active => vec![Active, PastDue, Canceled],
            PastDue => vec![Active, Canceled],
            Canceled => vec![Active, PendingTierSelection],
        }
    }
}
