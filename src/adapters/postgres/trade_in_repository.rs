//! PostgreSQL implementation of TradeInRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{BatchId, DomainError, ErrorCode, MemberId, Money, Timestamp};
use crate::domain::trade_in::{BatchStatus, TradeInBatch};
use crate::ports::TradeInRepository;

use super::db_error;

/// PostgreSQL implementation of the TradeInRepository port.
pub struct PostgresTradeInRepository {
    pool: PgPool,
}

impl PostgresTradeInRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a trade-in batch.
#[derive(Debug, sqlx::FromRow)]
struct BatchRow {
    id: i64,
    member_id: i64,
    reference_code: String,
    status: String,
    item_count: i32,
    trade_value_cents: i64,
    received_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BatchRow> for TradeInBatch {
    type Error = DomainError;

    fn try_from(row: BatchRow) -> Result<Self, Self::Error> {
        let item_count = u32::try_from(row.item_count).map_err(|_| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid item count value: {}", row.item_count),
            )
        })?;

        Ok(TradeInBatch {
            id: BatchId::new(row.id),
            member_id: MemberId::new(row.member_id),
            reference_code: row.reference_code,
            status: parse_batch_status(&row.status)?,
            item_count,
            trade_value: Money::from_cents(row.trade_value_cents),
            received_at: Timestamp::from_datetime(row.received_at),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_batch_status(s: &str) -> Result<BatchStatus, DomainError> {
    match s {
        "pending" => Ok(BatchStatus::Pending),
        "priced" => Ok(BatchStatus::Priced),
        "credited" => Ok(BatchStatus::Credited),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid batch status value: {}", s),
        )),
    }
}

const BATCH_COLUMNS: &str = "id, member_id, reference_code, status, item_count, \
     trade_value_cents, received_at, created_at, updated_at";

#[async_trait]
impl TradeInRepository for PostgresTradeInRepository {
    async fn allocate_id(&self) -> Result<BatchId, DomainError> {
        let (id,): (i64,) = sqlx::query_as("SELECT nextval('trade_in_batches_id_seq')")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to allocate batch id", e))?;
        Ok(BatchId::new(id))
    }

    async fn save(&self, batch: &TradeInBatch) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO trade_in_batches (
                id, member_id, reference_code, status, item_count,
                trade_value_cents, received_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(batch.id.value())
        .bind(batch.member_id.value())
        .bind(&batch.reference_code)
        .bind(batch.status.as_str())
        .bind(batch.item_count as i32)
        .bind(batch.trade_value.cents())
        .bind(batch.received_at.as_datetime())
        .bind(batch.created_at.as_datetime())
        .bind(batch.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to save trade-in batch", e))?;

        Ok(())
    }

    async fn update(&self, batch: &TradeInBatch) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE trade_in_batches SET
                status = $2,
                item_count = $3,
                trade_value_cents = $4,
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(batch.id.value())
        .bind(batch.status.as_str())
        .bind(batch.item_count as i32)
        .bind(batch.trade_value.cents())
        .bind(batch.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update trade-in batch", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::BatchNotFound,
                format!("Trade-in batch not found: {}", batch.id),
            ));
        }

        Ok(())
    }

    async fn find_by_id(&self, id: BatchId) -> Result<Option<TradeInBatch>, DomainError> {
        let row: Option<BatchRow> = sqlx::query_as(&format!(
            "SELECT {} FROM trade_in_batches WHERE id = $1",
            BATCH_COLUMNS
        ))
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find trade-in batch", e))?;

        row.map(TradeInBatch::try_from).transpose()
    }

    async fn list_recent_by_member(
        &self,
        member_id: MemberId,
        limit: u32,
    ) -> Result<Vec<TradeInBatch>, DomainError> {
        let rows: Vec<BatchRow> = sqlx::query_as(&format!(
            "SELECT {} FROM trade_in_batches WHERE member_id = $1 \
             ORDER BY received_at DESC LIMIT $2",
            BATCH_COLUMNS
        ))
        .bind(member_id.value())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list trade-in batches", e))?;

        rows.into_iter().map(TradeInBatch::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_batch_status_roundtrips() {
        for status in [
            BatchStatus::Pending,
            BatchStatus::Priced,
            BatchStatus::Credited,
        ] {
            assert_eq!(parse_batch_status(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn parse_batch_status_rejects_invalid_values() {
        assert!(parse_batch_status("shipped").is_err());
    }
}
