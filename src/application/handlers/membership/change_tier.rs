//! ChangeTierHandler - moves an active member to a different tier.
//!
//! A same-state transition: the member stays `Active` and billing period
//! boundaries are untouched. The processor subscription moves to the new
//! monthly price and an audit note records the change.

use std::sync::Arc;

use crate::application::MemberLocks;
use crate::domain::foundation::{MemberId, TierId};
use crate::domain::member::{Member, MemberError};
use crate::ports::{MemberRepository, PaymentProvider, SubscriptionRepository, TierRegistry};

/// Command to change tier.
#[derive(Debug, Clone)]
pub struct ChangeTierCommand {
    pub member_id: MemberId,
    pub tier_id: TierId,
    pub reason: String,
}

/// Handler for tier changes.
pub struct ChangeTierHandler {
    locks: Arc<MemberLocks>,
    members: Arc<dyn MemberRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    tiers: Arc<dyn TierRegistry>,
    payments: Arc<dyn PaymentProvider>,
}

impl ChangeTierHandler {
    pub fn new(
        locks: Arc<MemberLocks>,
        members: Arc<dyn MemberRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        tiers: Arc<dyn TierRegistry>,
        payments: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            locks,
            members,
            subscriptions,
            tiers,
            payments,
        }
    }

    pub async fn handle(&self, cmd: ChangeTierCommand) -> Result<Member, MemberError> {
        let _guard = self.locks.acquire(cmd.member_id).await;

        let mut member = self
            .members
            .find_by_id(cmd.member_id)
            .await?
            .ok_or_else(|| MemberError::not_found(cmd.member_id))?;

        let tier = self
            .tiers
            .get(cmd.tier_id)
            .await
            .map_err(|_| MemberError::tier_not_found(cmd.tier_id))?;
        if !tier.active {
            return Err(MemberError::tier_not_found(cmd.tier_id));
        }

        let subscription = self
            .subscriptions
            .find_by_member(cmd.member_id)
            .await?
            .ok_or_else(|| MemberError::no_subscription(cmd.member_id))?;
        let processor_id = subscription
            .processor_subscription_id
            .as_deref()
            .ok_or_else(|| MemberError::no_subscription(cmd.member_id))?;

        // Reprice at the processor before touching local state, so a
        // processor failure leaves the member on their current tier.
        self.payments
            .change_subscription_price(processor_id, tier.monthly_price)
            .await
            .map_err(|e| MemberError::payment_failed(e.message))?;

        let audit = member.change_tier(tier.id, cmd.reason)?;
        self.members.record_tier_change(&audit).await?;
        self.members.update(&member).await?;

        tracing::info!(
            member_id = %member.id,
            previous_tier = ?audit.previous_tier_id,
            new_tier = %audit.new_tier_id,
            "member changed tier"
        );
        Ok(member)
    }
}
