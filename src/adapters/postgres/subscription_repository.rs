//! PostgreSQL implementation of SubscriptionRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, MemberId, SubscriptionId, Timestamp};
use crate::domain::member::{PaymentStatus, Subscription};
use crate::ports::SubscriptionRepository;

use super::db_error;

/// PostgreSQL implementation of the SubscriptionRepository port.
pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: i64,
    member_id: i64,
    processor_customer_id: String,
    processor_subscription_id: Option<String>,
    payment_status: String,
    current_period_start: DateTime<Utc>,
    current_period_end: DateTime<Utc>,
    cancel_at_period_end: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: SubscriptionId::new(row.id),
            member_id: MemberId::new(row.member_id),
            processor_customer_id: row.processor_customer_id,
            processor_subscription_id: row.processor_subscription_id,
            payment_status: parse_payment_status(&row.payment_status)?,
            current_period_start: Timestamp::from_datetime(row.current_period_start),
            current_period_end: Timestamp::from_datetime(row.current_period_end),
            cancel_at_period_end: row.cancel_at_period_end,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_payment_status(s: &str) -> Result<PaymentStatus, DomainError> {
    match s {
        "pending" => Ok(PaymentStatus::Pending),
        "paid" => Ok(PaymentStatus::Paid),
        "failed" => Ok(PaymentStatus::Failed),
        "canceled" => Ok(PaymentStatus::Canceled),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid payment status value: {}", s),
        )),
    }
}

const SUBSCRIPTION_COLUMNS: &str = "id, member_id, processor_customer_id, \
     processor_subscription_id, payment_status, current_period_start, \
     current_period_end, cancel_at_period_end, created_at, updated_at";

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn allocate_id(&self) -> Result<SubscriptionId, DomainError> {
        let (id,): (i64,) = sqlx::query_as("SELECT nextval('subscriptions_id_seq')")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to allocate subscription id", e))?;
        Ok(SubscriptionId::new(id))
    }

    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, member_id, processor_customer_id, processor_subscription_id,
                payment_status, current_period_start, current_period_end,
                cancel_at_period_end, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(subscription.id.value())
        .bind(subscription.member_id.value())
        .bind(&subscription.processor_customer_id)
        .bind(&subscription.processor_subscription_id)
        .bind(subscription.payment_status.as_str())
        .bind(subscription.current_period_start.as_datetime())
        .bind(subscription.current_period_end.as_datetime())
        .bind(subscription.cancel_at_period_end)
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to save subscription", e))?;

        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                processor_customer_id = $2,
                processor_subscription_id = $3,
                payment_status = $4,
                current_period_start = $5,
                current_period_end = $6,
                cancel_at_period_end = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(subscription.id.value())
        .bind(&subscription.processor_customer_id)
        .bind(&subscription.processor_subscription_id)
        .bind(subscription.payment_status.as_str())
        .bind(subscription.current_period_start.as_datetime())
        .bind(subscription.current_period_end.as_datetime())
        .bind(subscription.cancel_at_period_end)
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update subscription", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("Subscription not found: {}", subscription.id),
            ));
        }

        Ok(())
    }

    async fn find_by_member(
        &self,
        member_id: MemberId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions WHERE member_id = $1 \
             ORDER BY created_at DESC LIMIT 1",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(member_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_by_processor_id(
        &self,
        processor_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions WHERE processor_subscription_id = $1",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(processor_subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find subscription by processor id", e))?;

        row.map(Subscription::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_payment_status_roundtrips() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Paid,
            PaymentStatus::Failed,
            PaymentStatus::Canceled,
        ] {
            assert_eq!(parse_payment_status(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn parse_payment_status_rejects_invalid_values() {
        assert!(parse_payment_status("unknown").is_err());
    }
}
