//! Tier registry port.

use crate::domain::foundation::{DomainError, TierId};
use crate::domain::tier::Tier;
use async_trait::async_trait;

/// Catalog of membership tier versions.
///
/// Implementations cache tiers in memory with explicit invalidation on
/// write; reads never block on external systems.
#[async_trait]
pub trait TierRegistry: Send + Sync {
    /// Lists active tiers ordered by monthly price ascending.
    async fn list_active(&self) -> Result<Vec<Tier>, DomainError>;

    /// Resolves a tier version by id, active or not. Historical ledger
    /// entries reference deactivated versions.
    ///
    /// # Errors
    ///
    /// - `TierNotFound` for an unknown id. Callers treat this as a
    ///   configuration error, not retryable.
    async fn get(&self, id: TierId) -> Result<Tier, DomainError>;

    /// Allocates the next tier id for a new version.
    async fn allocate_id(&self) -> Result<TierId, DomainError>;

    /// Persists a tier version and deactivates its predecessor in the same
    /// write, then invalidates the cache.
    async fn save_version(
        &self,
        tier: &Tier,
        previous: Option<TierId>,
    ) -> Result<(), DomainError>;
}
