//! Member aggregate entity.
//!
//! The Member is the authoritative record of a person's standing in the
//! loyalty program. Lifecycle transitions go through the `MemberStatus`
//! state machine; anything that mutates a Member for a given id must hold
//! that member's lock (see `application::member_lock`).
//!
//! # Design Decisions
//!
//! - **Email unique**: enforced by the repository
//! - **Tier by reference**: the member points at an immutable tier version;
//!   the ledger snapshots calculation inputs separately
//! - **Activation is external**: only a verified processor callback moves
//!   `PendingPayment` to `Active`

use crate::domain::foundation::{
    DomainError, ErrorCode, MemberId, MemberNumber, StateMachine, TierId, Timestamp,
    ValidationError,
};
use serde::{Deserialize, Serialize};

use super::MemberStatus;

/// Member aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub member_number: MemberNumber,

    /// Unique across the program.
    pub email: String,

    pub name: Option<String>,
    pub status: MemberStatus,

    /// Currently assigned tier version, if any.
    pub tier_id: Option<TierId>,

    /// Linked commerce-platform customer id, once known.
    pub commerce_customer_id: Option<String>,

    /// Set on first activation.
    pub membership_start: Option<Timestamp>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Audit note recorded when an active member changes tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierChangeAudit {
    pub member_id: MemberId,
    pub previous_tier_id: Option<TierId>,
    pub new_tier_id: TierId,
    pub reason: String,
    pub changed_at: Timestamp,
}

impl Member {
    /// Creates a new account. Accounts land directly in
    /// `PendingTierSelection`; there is no persisted no-account state.
    pub fn signup(
        id: MemberId,
        email: impl Into<String>,
        name: Option<String>,
    ) -> Result<Self, ValidationError> {
        let email = email.into();
        if email.trim().is_empty() {
            return Err(ValidationError::empty_field("email"));
        }
        if !email.contains('@') {
            return Err(ValidationError::invalid_format("email", "missing @"));
        }

        let now = Timestamp::now();
        Ok(Self {
            id,
            member_number: MemberNumber::from_member_id(id),
            email,
            name,
            status: MemberStatus::PendingTierSelection,
            tier_id: None,
            commerce_customer_id: None,
            membership_start: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Assigns a tier and moves to `PendingPayment`.
    ///
    /// The caller is responsible for validating the tier against the
    /// registry first; an inactive or unknown tier id is a configuration
    /// error, not retryable.
    pub fn select_tier(&mut self, tier_id: TierId) -> Result<(), DomainError> {
        self.transition_to(MemberStatus::PendingPayment)?;
        self.tier_id = Some(tier_id);
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Activates the membership after a verified payment-setup callback.
    ///
    /// # Errors
    ///
    /// Returns error unless the member is in `PendingPayment`, `PastDue`
    /// (billing recovered) or `Canceled` (reactivation).
    pub fn activate(&mut self) -> Result<(), DomainError> {
        if self.status == MemberStatus::PendingTierSelection {
            // Explicit guard: activation must never skip tier selection
            // and payment setup.
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                "cannot activate a member who has not selected a tier",
            )
            .with_detail("current", self.status.as_str())
            .with_detail("attempted", "activate"));
        }
        self.transition_to(MemberStatus::Active)?;
        if self.membership_start.is_none() {
            self.membership_start = Some(Timestamp::now());
        }
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Flags the member past due after a failed-payment notification.
    /// The tier assignment is retained.
    pub fn mark_past_due(&mut self) -> Result<(), DomainError> {
        self.transition_to(MemberStatus::PastDue)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Cancels the membership. The tier is retained for audit; benefits end.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.transition_to(MemberStatus::Canceled)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Returns the member to tier selection after upstream termination.
    pub fn restart_tier_selection(&mut self) -> Result<(), DomainError> {
        self.transition_to(MemberStatus::PendingTierSelection)?;
        self.tier_id = None;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Changes tier while active. Same-state transition; billing period
    /// boundaries are untouched. Returns the audit note for recording.
    pub fn change_tier(
        &mut self,
        new_tier_id: TierId,
        reason: impl Into<String>,
    ) -> Result<TierChangeAudit, DomainError> {
        if self.status != MemberStatus::Active {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "tier change requires an active membership, member is {}",
                    self.status.as_str()
                ),
            ));
        }
        if self.tier_id == Some(new_tier_id) {
            return Err(DomainError::validation(
                "tier_id",
                "member is already on this tier",
            ));
        }

        let audit = TierChangeAudit {
            member_id: self.id,
            previous_tier_id: self.tier_id,
            new_tier_id,
            reason: reason.into(),
            changed_at: Timestamp::now(),
        };

        self.tier_id = Some(new_tier_id);
        self.updated_at = audit.changed_at;
        Ok(audit)
    }

    /// Links the member to their commerce-platform customer account.
    pub fn link_commerce_customer(&mut self, customer_id: impl Into<String>) {
        self.commerce_customer_id = Some(customer_id.into());
        self.updated_at = Timestamp::now();
    }

    fn transition_to(&mut self, target: MemberStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition member from {} to {}",
                    self.status.as_str(),
                    target.as_str()
                ),
            )
            .with_detail("current", self.status.as_str())
            .with_detail("attempted", format!("enter {}", target.as_str()))
        })?;
        Ok(())
    }
}
