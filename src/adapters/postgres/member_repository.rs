//! PostgreSQL implementation of MemberRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, MemberId, MemberNumber, TierId, Timestamp};
use crate::domain::member::{Member, MemberStatus, TierChangeAudit};
use crate::ports::MemberRepository;

use super::db_error;

/// PostgreSQL implementation of the MemberRepository port.
pub struct PostgresMemberRepository {
    pool: PgPool,
}

impl PostgresMemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a member.
#[derive(Debug, sqlx::FromRow)]
struct MemberRow {
    id: i64,
    member_number: String,
    email: String,
    name: Option<String>,
    status: String,
    tier_id: Option<i64>,
    commerce_customer_id: Option<String>,
    membership_start: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MemberRow> for Member {
    type Error = DomainError;

    fn try_from(row: MemberRow) -> Result<Self, Self::Error> {
        Ok(Member {
            id: MemberId::new(row.id),
            member_number: MemberNumber::parse(row.member_number).map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Invalid member_number: {}", e),
                )
            })?,
            email: row.email,
            name: row.name,
            status: parse_member_status(&row.status)?,
            tier_id: row.tier_id.map(TierId::new),
            commerce_customer_id: row.commerce_customer_id,
            membership_start: row.membership_start.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_member_status(s: &str) -> Result<MemberStatus, DomainError> {
    match s {
        "pending_tier_selection" => Ok(MemberStatus::PendingTierSelection),
        "pending_payment" => Ok(MemberStatus::PendingPayment),
        "active" => Ok(MemberStatus::Active),
        "past_due" => Ok(MemberStatus::PastDue),
        "canceled" => Ok(MemberStatus::Canceled),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid member status value: {}", s),
        )),
    }
}

const MEMBER_COLUMNS: &str = "id, member_number, email, name, status, tier_id, \
     commerce_customer_id, membership_start, created_at, updated_at";

#[async_trait]
impl MemberRepository for PostgresMemberRepository {
    async fn allocate_id(&self) -> Result<MemberId, DomainError> {
        let (id,): (i64,) = sqlx::query_as("SELECT nextval('members_id_seq')")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to allocate member id", e))?;
        Ok(MemberId::new(id))
    }

    async fn save(&self, member: &Member) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO members (
                id, member_number, email, name, status, tier_id,
                commerce_customer_id, membership_start, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(member.id.value())
        .bind(member.member_number.as_str())
        .bind(&member.email)
        .bind(&member.name)
        .bind(member.status.as_str())
        .bind(member.tier_id.map(|t| t.value()))
        .bind(&member.commerce_customer_id)
        .bind(member.membership_start.map(|t| *t.as_datetime()))
        .bind(member.created_at.as_datetime())
        .bind(member.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("members_email_key") {
                    return DomainError::new(
                        ErrorCode::MemberExists,
                        format!("An account already exists for {}", member.email),
                    );
                }
            }
            db_error("Failed to save member", e)
        })?;

        Ok(())
    }

    async fn update(&self, member: &Member) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE members SET
                email = $2,
                name = $3,
                status = $4,
                tier_id = $5,
                commerce_customer_id = $6,
                membership_start = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(member.id.value())
        .bind(&member.email)
        .bind(&member.name)
        .bind(member.status.as_str())
        .bind(member.tier_id.map(|t| t.value()))
        .bind(&member.commerce_customer_id)
        .bind(member.membership_start.map(|t| *t.as_datetime()))
        .bind(member.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update member", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::MemberNotFound,
                format!("Member not found: {}", member.id),
            ));
        }

        Ok(())
    }

    async fn find_by_id(&self, id: MemberId) -> Result<Option<Member>, DomainError> {
        let row: Option<MemberRow> = sqlx::query_as(&format!(
            "SELECT {} FROM members WHERE id = $1",
            MEMBER_COLUMNS
        ))
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find member", e))?;

        row.map(Member::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Member>, DomainError> {
        let row: Option<MemberRow> = sqlx::query_as(&format!(
            "SELECT {} FROM members WHERE email = $1",
            MEMBER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find member by email", e))?;

        row.map(Member::try_from).transpose()
    }

    async fn record_tier_change(&self, audit: &TierChangeAudit) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO tier_changes (
                member_id, previous_tier_id, new_tier_id, reason, changed_at
            ) VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(audit.member_id.value())
        .bind(audit.previous_tier_id.map(|t| t.value()))
        .bind(audit.new_tier_id.value())
        .bind(&audit.reason)
        .bind(audit.changed_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to record tier change", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_member_status_roundtrips() {
        for status in [
            MemberStatus::PendingTierSelection,
            MemberStatus::PendingPayment,
            MemberStatus::Active,
            MemberStatus::PastDue,
            MemberStatus::Canceled,
        ] {
            assert_eq!(parse_member_status(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn parse_member_status_rejects_invalid_values() {
        assert!(parse_member_status("invalid").is_err());
        assert!(parse_member_status("").is_err());
    }
}
