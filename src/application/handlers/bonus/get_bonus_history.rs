//! GetBonusHistoryHandler - paginated ledger read for one member.

use std::sync::Arc;

use crate::domain::foundation::{MemberId, Money};
use crate::domain::ledger::BonusTransaction;
use crate::domain::member::MemberError;
use crate::ports::{LedgerStore, MemberRepository};

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 100;

/// Query for a page of bonus history.
#[derive(Debug, Clone)]
pub struct GetBonusHistoryQuery {
    pub member_id: MemberId,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// One page of bonus history plus the ledger-derived lifetime total.
#[derive(Debug, Clone)]
pub struct BonusHistoryPage {
    pub entries: Vec<BonusTransaction>,
    pub total_bonus: Money,
    pub limit: u32,
    pub offset: u32,
}

/// Handler for bonus history reads.
pub struct GetBonusHistoryHandler {
    members: Arc<dyn MemberRepository>,
    ledger: Arc<dyn LedgerStore>,
}

impl GetBonusHistoryHandler {
    pub fn new(members: Arc<dyn MemberRepository>, ledger: Arc<dyn LedgerStore>) -> Self {
        Self { members, ledger }
    }

    pub async fn handle(
        &self,
        query: GetBonusHistoryQuery,
    ) -> Result<BonusHistoryPage, MemberError> {
        self.members
            .find_by_id(query.member_id)
            .await?
            .ok_or_else(|| MemberError::not_found(query.member_id))?;

        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = query.offset.unwrap_or(0);

        let entries = self
            .ledger
            .list_by_member(query.member_id, limit, offset)
            .await?;
        let total_bonus = self.ledger.sum_by_member(query.member_id).await?;

        Ok(BonusHistoryPage {
            entries,
            total_bonus,
            limit,
            offset,
        })
    }
}
