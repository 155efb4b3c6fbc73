//! PostgreSQL implementation of LedgerStore.
//!
//! Idempotency rides on the unique index over `idempotency_key`. The row id
//! is derived from that key, so a replayed insert conflicts on both the key
//! index and the primary key; the bare `ON CONFLICT DO NOTHING` swallows
//! either and surfaces `AppendOutcome::Duplicate`. Totals are aggregated in
//! SQL, never cached.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    BatchId, DomainError, ErrorCode, MemberId, Money, Timestamp, TransactionId,
};
use crate::domain::ledger::{
    BonusTransaction, CalculationSnapshot, Creator, IdempotencyKey, TransactionType,
};
use crate::ports::{AppendOutcome, LedgerStore};

use super::db_error;

/// PostgreSQL implementation of the LedgerStore port.
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a ledger entry.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    member_id: i64,
    item_reference: Option<String>,
    batch_id: Option<i64>,
    amount_cents: i64,
    transaction_type: String,
    idempotency_key: String,
    snapshot: Option<String>,
    created_at: DateTime<Utc>,
    created_by_kind: String,
    created_by_staff_id: Option<String>,
}

impl TryFrom<TransactionRow> for BonusTransaction {
    type Error = DomainError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let snapshot = row
            .snapshot
            .as_deref()
            .map(serde_json::from_str::<CalculationSnapshot>)
            .transpose()
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Invalid calculation snapshot: {}", e),
                )
            })?;

        Ok(BonusTransaction {
            id: TransactionId::from_uuid(row.id),
            member_id: MemberId::new(row.member_id),
            item_reference: row.item_reference,
            batch_id: row.batch_id.map(BatchId::new),
            amount: Money::from_cents(row.amount_cents),
            transaction_type: parse_transaction_type(&row.transaction_type)?,
            idempotency_key: IdempotencyKey::new(row.idempotency_key)?,
            snapshot,
            created_at: Timestamp::from_datetime(row.created_at),
            created_by: decode_creator(&row.created_by_kind, row.created_by_staff_id)?,
        })
    }
}

fn parse_transaction_type(s: &str) -> Result<TransactionType, DomainError> {
    match s {
        "trade_in_bonus" => Ok(TransactionType::TradeInBonus),
        "manual_adjustment" => Ok(TransactionType::ManualAdjustment),
        "promotion" => Ok(TransactionType::Promotion),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid transaction type value: {}", s),
        )),
    }
}

fn encode_creator(creator: &Creator) -> (&'static str, Option<&str>) {
    match creator {
        Creator::System => ("system", None),
        Creator::Staff(id) => ("staff", Some(id.as_str())),
    }
}

fn decode_creator(kind: &str, staff_id: Option<String>) -> Result<Creator, DomainError> {
    match (kind, staff_id) {
        ("system", _) => Ok(Creator::System),
        ("staff", Some(id)) => Ok(Creator::Staff(id)),
        ("staff", None) => Err(DomainError::new(
            ErrorCode::DatabaseError,
            "Staff-created entry is missing its staff id",
        )),
        (other, _) => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid creator kind value: {}", other),
        )),
    }
}

const TRANSACTION_COLUMNS: &str = "id, member_id, item_reference, batch_id, amount_cents, \
     transaction_type, idempotency_key, snapshot, created_at, created_by_kind, \
     created_by_staff_id";

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn append(&self, entry: &BonusTransaction) -> Result<AppendOutcome, DomainError> {
        let snapshot = entry
            .snapshot
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to serialize snapshot: {}", e),
                )
            })?;
        let (creator_kind, staff_id) = encode_creator(&entry.created_by);

        let result = sqlx::query(
            r#"
            INSERT INTO bonus_transactions (
                id, member_id, item_reference, batch_id, amount_cents,
                transaction_type, idempotency_key, snapshot, created_at,
                created_by_kind, created_by_staff_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.member_id.value())
        .bind(&entry.item_reference)
        .bind(entry.batch_id.map(|b| b.value()))
        .bind(entry.amount.cents())
        .bind(entry.transaction_type.as_str())
        .bind(entry.idempotency_key.as_str())
        .bind(snapshot)
        .bind(entry.created_at.as_datetime())
        .bind(creator_kind)
        .bind(staff_id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to append ledger entry", e))?;

        if result.rows_affected() == 0 {
            return Ok(AppendOutcome::Duplicate);
        }
        Ok(AppendOutcome::Committed)
    }

    async fn list_by_member(
        &self,
        member_id: MemberId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<BonusTransaction>, DomainError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bonus_transactions WHERE member_id = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            TRANSACTION_COLUMNS
        ))
        .bind(member_id.value())
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list ledger entries", e))?;

        rows.into_iter().map(BonusTransaction::try_from).collect()
    }

    async fn sum_by_member(&self, member_id: MemberId) -> Result<Money, DomainError> {
        let (total,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount_cents), 0) FROM bonus_transactions \
             WHERE member_id = $1",
        )
        .bind(member_id.value())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to sum member bonuses", e))?;

        Ok(Money::from_cents(total))
    }

    async fn sum_by_batch(&self, batch_id: BatchId) -> Result<Money, DomainError> {
        let (total,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount_cents), 0) FROM bonus_transactions \
             WHERE batch_id = $1",
        )
        .bind(batch_id.value())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to sum batch bonuses", e))?;

        Ok(Money::from_cents(total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_transaction_type_roundtrips() {
        for tt in [
            TransactionType::TradeInBonus,
            TransactionType::ManualAdjustment,
            TransactionType::Promotion,
        ] {
            assert_eq!(parse_transaction_type(tt.as_str()).unwrap(), tt);
        }
    }

    #[test]
    fn parse_transaction_type_rejects_invalid_values() {
        assert!(parse_transaction_type("refund").is_err());
    }

    #[test]
    fn creator_encoding_roundtrips() {
        let (kind, staff) = encode_creator(&Creator::System);
        assert_eq!(decode_creator(kind, staff.map(String::from)).unwrap(), Creator::System);

        let staff_creator = Creator::Staff("staff-7".to_string());
        let (kind, staff) = encode_creator(&staff_creator);
        assert_eq!(
            decode_creator(kind, staff.map(String::from)).unwrap(),
            staff_creator
        );
    }

    #[test]
    fn staff_creator_without_id_is_rejected() {
        assert!(decode_creator("staff", None).is_err());
    }

    #[test]
    fn unknown_creator_kind_is_rejected() {
        assert!(decode_creator("robot", None).is_err());
    }
}
