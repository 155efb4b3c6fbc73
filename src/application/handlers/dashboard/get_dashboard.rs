//! GetDashboardHandler - best-effort composition of the member dashboard.
//!
//! The member record is the only required fetch. Ledger, batch,
//! subscription, and store-credit fetches run concurrently, each under its
//! own timeout; a failed or slow fetch degrades to a documented default and
//! is logged, never surfaced to the caller.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use crate::domain::dashboard::{MemberDashboard, StoreCreditBalance};
use crate::domain::foundation::{DomainError, MemberId, Money};
use crate::domain::member::MemberError;
use crate::ports::{
    LedgerStore, MemberRepository, StoreCreditGateway, SubscriptionRepository, TradeInRepository,
};

const RECENT_BONUSES: u32 = 5;
const RECENT_BATCHES: u32 = 5;

/// Handler for the aggregated dashboard read.
pub struct GetDashboardHandler {
    members: Arc<dyn MemberRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    ledger: Arc<dyn LedgerStore>,
    trade_ins: Arc<dyn TradeInRepository>,
    store_credit: Arc<dyn StoreCreditGateway>,

    /// Per-fetch budget; anything slower counts as a failed fetch.
    fetch_timeout: Duration,
}

impl GetDashboardHandler {
    pub fn new(
        members: Arc<dyn MemberRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        ledger: Arc<dyn LedgerStore>,
        trade_ins: Arc<dyn TradeInRepository>,
        store_credit: Arc<dyn StoreCreditGateway>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            members,
            subscriptions,
            ledger,
            trade_ins,
            store_credit,
            fetch_timeout,
        }
    }

    pub async fn handle(&self, member_id: MemberId) -> Result<MemberDashboard, MemberError> {
        let member = self
            .members
            .find_by_id(member_id)
            .await?
            .ok_or_else(|| MemberError::not_found(member_id))?;

        let t = self.fetch_timeout;
        let (subscription, bonuses, total, batches, credit) = tokio::join!(
            timeout(t, self.subscriptions.find_by_member(member_id)),
            timeout(t, self.ledger.list_by_member(member_id, RECENT_BONUSES, 0)),
            timeout(t, self.ledger.sum_by_member(member_id)),
            timeout(t, self.trade_ins.list_recent_by_member(member_id, RECENT_BATCHES)),
            timeout(t, self.store_credit.fetch_balance(member_id)),
        );

        let mut degraded = false;
        let subscription = absorb(subscription, "subscription", &mut degraded, None);
        let recent_bonuses = absorb(bonuses, "recent_bonuses", &mut degraded, Vec::new());
        let total_bonus = absorb(total, "total_bonus", &mut degraded, Money::ZERO);
        let recent_batches = absorb(batches, "recent_batches", &mut degraded, Vec::new());
        let store_credit = absorb(
            credit,
            "store_credit",
            &mut degraded,
            StoreCreditBalance::unknown(),
        );

        Ok(MemberDashboard {
            member,
            subscription,
            recent_bonuses,
            total_bonus,
            recent_batches,
            store_credit,
            degraded,
        })
    }
}

/// Collapses a timed sub-fetch onto its default, logging the failure.
fn absorb<T>(
    result: Result<Result<T, DomainError>, tokio::time::error::Elapsed>,
    field: &str,
    degraded: &mut bool,
    default: T,
) -> T {
    match result {
        Ok(Ok(value)) => value,
        Ok(Err(err)) => {
            tracing::warn!(field, error = %err, "dashboard sub-fetch failed, using default");
            *degraded = true;
            default
        }
        Err(_) => {
            tracing::warn!(field, "dashboard sub-fetch timed out, using default");
            *degraded = true;
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryLedgerStore, InMemoryMemberRepository, InMemorySubscriptionRepository,
        InMemoryTradeInRepository,
    };
    use crate::domain::foundation::BatchId;
    use crate::domain::ledger::{BonusTransaction, Creator, IdempotencyKey};
    use crate::domain::member::Member;
    use async_trait::async_trait;

    struct FailingStoreCreditGateway;

    #[async_trait]
    impl StoreCreditGateway for FailingStoreCreditGateway {
        async fn fetch_balance(
            &self,
            _member_id: MemberId,
        ) -> Result<StoreCreditBalance, DomainError> {
            Err(DomainError::external_unavailable(
                "commerce_platform",
                "unreachable",
            ))
        }

        async fn push_batch_credit(
            &self,
            _member_id: MemberId,
            _batch_id: BatchId,
            _amount: Money,
        ) -> Result<(), DomainError> {
            Ok(())
        }
    }

    struct SlowStoreCreditGateway;

    #[async_trait]
    impl StoreCreditGateway for SlowStoreCreditGateway {
        async fn fetch_balance(
            &self,
            _member_id: MemberId,
        ) -> Result<StoreCreditBalance, DomainError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(StoreCreditBalance::fresh(Money::from_cents(1), "USD"))
        }

        async fn push_batch_credit(
            &self,
            _member_id: MemberId,
            _batch_id: BatchId,
            _amount: Money,
        ) -> Result<(), DomainError> {
            Ok(())
        }
    }

    struct HealthyStoreCreditGateway;

    #[async_trait]
    impl StoreCreditGateway for HealthyStoreCreditGateway {
        async fn fetch_balance(
            &self,
            _member_id: MemberId,
        ) -> Result<StoreCreditBalance, DomainError> {
            Ok(StoreCreditBalance::fresh(Money::from_cents(4_200), "USD"))
        }

        async fn push_batch_credit(
            &self,
            _member_id: MemberId,
            _batch_id: BatchId,
            _amount: Money,
        ) -> Result<(), DomainError> {
            Ok(())
        }
    }

    struct Fixture {
        members: Arc<InMemoryMemberRepository>,
        ledger: Arc<InMemoryLedgerStore>,
        handler: GetDashboardHandler,
    }

    fn fixture(gateway: Arc<dyn StoreCreditGateway>) -> Fixture {
        let members = Arc::new(InMemoryMemberRepository::new());
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let handler = GetDashboardHandler::new(
            members.clone(),
            Arc::new(InMemorySubscriptionRepository::new()),
            ledger.clone(),
            Arc::new(InMemoryTradeInRepository::new()),
            gateway,
            Duration::from_millis(200),
        );
        Fixture {
            members,
            ledger,
            handler,
        }
    }

    async fn seeded_member(f: &Fixture) -> MemberId {
        let id = f.members.allocate_id().await.unwrap();
        let member = Member::signup(id, "pat@example.com", None).unwrap();
        f.members.save(&member).await.unwrap();

        let entry = BonusTransaction::promotion(
            id,
            Money::from_cents(9_000),
            IdempotencyKey::new("promo-1").unwrap(),
            Creator::System,
        )
        .unwrap();
        f.ledger.append(&entry).await.unwrap();
        id
    }

    #[tokio::test]
    async fn healthy_fetches_compose_fully() {
        let f = fixture(Arc::new(HealthyStoreCreditGateway));
        let member_id = seeded_member(&f).await;

        let dashboard = f.handler.handle(member_id).await.unwrap();

        assert!(!dashboard.degraded);
        assert_eq!(dashboard.total_bonus, Money::from_cents(9_000));
        assert_eq!(dashboard.recent_bonuses.len(), 1);
        assert_eq!(dashboard.store_credit.amount, Money::from_cents(4_200));
        assert!(!dashboard.store_credit.stale);
    }

    #[tokio::test]
    async fn store_credit_failure_degrades_without_error() {
        let f = fixture(Arc::new(FailingStoreCreditGateway));
        let member_id = seeded_member(&f).await;

        let dashboard = f.handler.handle(member_id).await.unwrap();

        assert!(dashboard.degraded);
        assert!(dashboard.store_credit.stale);
        assert_eq!(dashboard.store_credit.amount, Money::ZERO);
        // Member and ledger data are intact.
        assert_eq!(dashboard.member.id, member_id);
        assert_eq!(dashboard.total_bonus, Money::from_cents(9_000));
    }

    #[tokio::test]
    async fn slow_fetch_counts_as_failure_not_a_stall() {
        let f = fixture(Arc::new(SlowStoreCreditGateway));
        let member_id = seeded_member(&f).await;

        let started = std::time::Instant::now();
        let dashboard = f.handler.handle(member_id).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(dashboard.degraded);
        assert!(dashboard.store_credit.stale);
    }

    #[tokio::test]
    async fn missing_member_is_the_only_hard_failure() {
        let f = fixture(Arc::new(HealthyStoreCreditGateway));
        let result = f.handler.handle(MemberId::new(404)).await;
        assert!(matches!(result, Err(MemberError::NotFound(_))));
    }
}
