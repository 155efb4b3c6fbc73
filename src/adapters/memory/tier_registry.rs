//! In-memory tier registry with a cached active list.

use crate::domain::foundation::{DomainError, ErrorCode, TierId};
use crate::domain::tier::Tier;
use crate::ports::TierRegistry;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

/// In-memory `TierRegistry`.
///
/// The active list is cached and invalidated on write, matching the read
/// path contract that tier reads never block on external systems.
#[derive(Default)]
pub struct InMemoryTierRegistry {
    tiers: RwLock<HashMap<TierId, Tier>>,
    active_cache: RwLock<Option<Vec<Tier>>>,
    next_id: AtomicI64,
}

impl InMemoryTierRegistry {
    pub fn new() -> Self {
        Self {
            tiers: RwLock::new(HashMap::new()),
            active_cache: RwLock::new(None),
            next_id: AtomicI64::new(1),
        }
    }

    /// Seeds a registry with tier versions, for tests and local runs.
    pub fn with_tiers(tiers: Vec<Tier>) -> Self {
        let max_id = tiers.iter().map(|t| t.id.value()).max().unwrap_or(0);
        Self {
            tiers: RwLock::new(tiers.into_iter().map(|t| (t.id, t)).collect()),
            active_cache: RwLock::new(None),
            next_id: AtomicI64::new(max_id + 1),
        }
    }
}

#[async_trait]
impl TierRegistry for InMemoryTierRegistry {
    async fn list_active(&self) -> Result<Vec<Tier>, DomainError> {
        if let Some(cached) = self.active_cache.read().unwrap().as_ref() {
            return Ok(cached.clone());
        }

        let mut active: Vec<Tier> = self
            .tiers
            .read()
            .unwrap()
            .values()
            .filter(|t| t.active)
            .cloned()
            .collect();
        active.sort_by_key(|t| t.monthly_price);

        *self.active_cache.write().unwrap() = Some(active.clone());
        Ok(active)
    }

    async fn get(&self, id: TierId) -> Result<Tier, DomainError> {
        self.tiers.read().unwrap().get(&id).cloned().ok_or_else(|| {
            DomainError::new(ErrorCode::TierNotFound, format!("tier {} not found", id))
        })
    }

    async fn allocate_id(&self) -> Result<TierId, DomainError> {
        Ok(TierId::new(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn save_version(
        &self,
        tier: &Tier,
        previous: Option<TierId>,
    ) -> Result<(), DomainError> {
        let mut tiers = self.tiers.write().unwrap();
        if let Some(previous_id) = previous {
            let predecessor = tiers.get_mut(&previous_id).ok_or_else(|| {
                DomainError::new(
                    ErrorCode::TierNotFound,
                    format!("predecessor tier {} not found", previous_id),
                )
            })?;
            predecessor.deactivate();
        }
        tiers.insert(tier.id, tier.clone());
        drop(tiers);

        // Cache invalidation on every write.
        *self.active_cache.write().unwrap() = None;
        Ok(())
    }
}
