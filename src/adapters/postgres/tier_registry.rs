//! PostgreSQL implementation of TierRegistry.
//!
//! The active-tier list is read on every signup and dashboard render, so it
//! is cached in memory and invalidated whenever a new version is written.
//! Lookups by id bypass the cache since they must resolve deactivated
//! versions too.

use std::sync::RwLock;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{BonusRate, DomainError, ErrorCode, Money, TierId};
use crate::domain::tier::{Tier, TierBenefits};
use crate::ports::TierRegistry;

use super::db_error;

/// PostgreSQL implementation of the TierRegistry port.
pub struct PostgresTierRegistry {
    pool: PgPool,
    active_cache: RwLock<Option<Vec<Tier>>>,
}

impl PostgresTierRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            active_cache: RwLock::new(None),
        }
    }

    fn cached_active(&self) -> Option<Vec<Tier>> {
        let guard = match self.active_cache.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.clone()
    }

    fn store_active(&self, tiers: Option<Vec<Tier>>) {
        let mut guard = match self.active_cache.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = tiers;
    }
}

/// Database row representation of a tier version.
#[derive(Debug, sqlx::FromRow)]
struct TierRow {
    id: i64,
    version: i32,
    name: String,
    monthly_price_cents: i64,
    bonus_rate_bp: i32,
    quick_flip_days: i32,
    early_access: bool,
    free_shipping: bool,
    exclusive_events: bool,
    active: bool,
}

impl TryFrom<TierRow> for Tier {
    type Error = DomainError;

    fn try_from(row: TierRow) -> Result<Self, Self::Error> {
        let bonus_rate = u32::try_from(row.bonus_rate_bp)
            .ok()
            .and_then(|bp| BonusRate::from_basis_points(bp).ok())
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Invalid bonus rate value: {}", row.bonus_rate_bp),
                )
            })?;
        let version = u32::try_from(row.version).map_err(|_| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid tier version value: {}", row.version),
            )
        })?;
        let quick_flip_days = u32::try_from(row.quick_flip_days).map_err(|_| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid quick flip window value: {}", row.quick_flip_days),
            )
        })?;

        Ok(Tier {
            id: TierId::new(row.id),
            version,
            name: row.name,
            monthly_price: Money::from_cents(row.monthly_price_cents),
            bonus_rate,
            quick_flip_days,
            benefits: TierBenefits {
                early_access: row.early_access,
                free_shipping: row.free_shipping,
                exclusive_events: row.exclusive_events,
            },
            active: row.active,
        })
    }
}

const TIER_COLUMNS: &str = "id, version, name, monthly_price_cents, bonus_rate_bp, \
     quick_flip_days, early_access, free_shipping, exclusive_events, active";

#[async_trait]
impl TierRegistry for PostgresTierRegistry {
    async fn list_active(&self) -> Result<Vec<Tier>, DomainError> {
        if let Some(tiers) = self.cached_active() {
            return Ok(tiers);
        }

        let rows: Vec<TierRow> = sqlx::query_as(&format!(
            "SELECT {} FROM tiers WHERE active = TRUE \
             ORDER BY monthly_price_cents ASC",
            TIER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list active tiers", e))?;

        let tiers = rows
            .into_iter()
            .map(Tier::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        self.store_active(Some(tiers.clone()));
        Ok(tiers)
    }

    async fn get(&self, id: TierId) -> Result<Tier, DomainError> {
        let row: Option<TierRow> =
            sqlx::query_as(&format!("SELECT {} FROM tiers WHERE id = $1", TIER_COLUMNS))
                .bind(id.value())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to find tier", e))?;

        match row {
            Some(row) => Tier::try_from(row),
            None => Err(DomainError::new(
                ErrorCode::TierNotFound,
                format!("Tier not found: {}", id),
            )),
        }
    }

    async fn allocate_id(&self) -> Result<TierId, DomainError> {
        let (id,): (i64,) = sqlx::query_as("SELECT nextval('tiers_id_seq')")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to allocate tier id", e))?;
        Ok(TierId::new(id))
    }

    async fn save_version(
        &self,
        tier: &Tier,
        previous: Option<TierId>,
    ) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin tier transaction", e))?;

        sqlx::query(
            r#"
            INSERT INTO tiers (
                id, version, name, monthly_price_cents, bonus_rate_bp,
                quick_flip_days, early_access, free_shipping,
                exclusive_events, active
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(tier.id.value())
        .bind(tier.version as i32)
        .bind(&tier.name)
        .bind(tier.monthly_price.cents())
        .bind(tier.bonus_rate.basis_points() as i32)
        .bind(tier.quick_flip_days as i32)
        .bind(tier.benefits.early_access)
        .bind(tier.benefits.free_shipping)
        .bind(tier.benefits.exclusive_events)
        .bind(tier.active)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to save tier version", e))?;

        if let Some(previous) = previous {
            sqlx::query("UPDATE tiers SET active = FALSE WHERE id = $1")
                .bind(previous.value())
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to deactivate previous tier version", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit tier transaction", e))?;

        self.store_active(None);
        Ok(())
    }
}
