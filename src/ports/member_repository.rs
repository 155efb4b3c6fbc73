//! Member and subscription repository ports (write side).
//!
//! # Design
//!
//! - **Repository-allocated ids**: numeric ids come from `allocate_id`, so
//!   aggregates are constructed complete and saved whole
//! - **Unique constraint**: email is unique across members; `save` fails
//!   with `MemberExists` on a duplicate
//! - **No deletes**: members transition to `Canceled`, rows stay

use crate::domain::foundation::{DomainError, MemberId, SubscriptionId};
use crate::domain::member::{Member, Subscription, TierChangeAudit};
use async_trait::async_trait;

/// Repository port for Member aggregate persistence.
#[async_trait]
pub trait MemberRepository: Send + Sync {
    /// Allocates the next member id.
    async fn allocate_id(&self) -> Result<MemberId, DomainError>;

    /// Saves a new member.
    ///
    /// # Errors
    ///
    /// - `MemberExists` if the email is already registered
    /// - `DatabaseError` on persistence failure
    async fn save(&self, member: &Member) -> Result<(), DomainError>;

    /// Updates an existing member.
    ///
    /// # Errors
    ///
    /// - `MemberNotFound` if the member doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update(&self, member: &Member) -> Result<(), DomainError>;

    /// Finds a member by id. Returns `None` if not found.
    async fn find_by_id(&self, id: MemberId) -> Result<Option<Member>, DomainError>;

    /// Finds a member by email. Returns `None` if not found.
    async fn find_by_email(&self, email: &str) -> Result<Option<Member>, DomainError>;

    /// Records a tier-change audit note.
    async fn record_tier_change(&self, audit: &TierChangeAudit) -> Result<(), DomainError>;
}

/// Repository port for Subscription persistence.
///
/// A member has at most one live subscription; lookups are by member.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Allocates the next subscription id.
    async fn allocate_id(&self) -> Result<SubscriptionId, DomainError>;

    /// Saves a new subscription.
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Updates an existing subscription.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the subscription doesn't exist
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Finds the member's current subscription. Returns `None` if the member
    /// never completed checkout.
    async fn find_by_member(&self, member_id: MemberId)
        -> Result<Option<Subscription>, DomainError>;

    /// Finds a subscription by the processor's subscription id, for webhook
    /// routing. Returns `None` if unknown.
    async fn find_by_processor_id(
        &self,
        processor_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety tests
    #[test]
    fn member_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn MemberRepository) {}
    }

    #[test]
    fn subscription_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn SubscriptionRepository) {}
    }
}
