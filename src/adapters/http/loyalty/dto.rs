//! JSON request/response types for the loyalty API.
//!
//! These are the HTTP boundary; domain types never serialize directly onto
//! the wire. Money crosses as integer minor units, timestamps as RFC 3339.

use serde::{Deserialize, Serialize};

use crate::domain::dashboard::{MemberDashboard, StoreCreditBalance};
use crate::domain::ledger::BonusTransaction;
use crate::domain::member::{Member, Subscription};
use crate::domain::tier::Tier;
use crate::domain::trade_in::TradeInBatch;

// Request DTOs

/// Request to create a member account.
#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Request to select a tier and start payment setup.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectTierRequest {
    pub tier_id: i64,
    pub success_url: String,
    pub cancel_url: String,
}

/// Request to move an active member to a different tier.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeTierRequest {
    pub tier_id: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Request to cancel a subscription.
#[derive(Debug, Clone, Deserialize)]
pub struct CancelRequest {
    /// When false, cancellation takes effect at the period boundary.
    #[serde(default)]
    pub immediate: bool,
}

/// Query parameters for the bonus history page.
#[derive(Debug, Clone, Deserialize)]
pub struct BonusHistoryParams {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

/// Staff request reporting that a traded-in item sold.
#[derive(Debug, Clone, Deserialize)]
pub struct TradeInSaleRequest {
    pub member_id: i64,
    pub item_reference: String,
    #[serde(default)]
    pub batch_id: Option<i64>,
    pub sale_price_cents: i64,
    pub trade_value_cents: i64,
    /// Unix seconds.
    pub sold_at: u64,
    /// Unix seconds.
    pub received_at: u64,
}

// Response DTOs

/// Member details.
#[derive(Debug, Clone, Serialize)]
pub struct MemberResponse {
    pub id: i64,
    pub member_number: String,
    pub email: String,
    pub name: Option<String>,
    pub status: String,
    pub tier_id: Option<i64>,
    pub membership_start: Option<String>,
    pub created_at: String,
}

impl From<&Member> for MemberResponse {
    fn from(member: &Member) -> Self {
        Self {
            id: member.id.value(),
            member_number: member.member_number.as_str().to_string(),
            email: member.email.clone(),
            name: member.name.clone(),
            status: member.status.as_str().to_string(),
            tier_id: member.tier_id.map(|t| t.value()),
            membership_start: member
                .membership_start
                .map(|t| t.as_datetime().to_rfc3339()),
            created_at: member.created_at.as_datetime().to_rfc3339(),
        }
    }
}

/// One membership tier offering.
#[derive(Debug, Clone, Serialize)]
pub struct TierResponse {
    pub id: i64,
    pub name: String,
    pub monthly_price_cents: i64,
    pub bonus_rate_basis_points: u32,
    pub quick_flip_days: u32,
    pub early_access: bool,
    pub free_shipping: bool,
    pub exclusive_events: bool,
}

impl From<&Tier> for TierResponse {
    fn from(tier: &Tier) -> Self {
        Self {
            id: tier.id.value(),
            name: tier.name.clone(),
            monthly_price_cents: tier.monthly_price.cents(),
            bonus_rate_basis_points: tier.bonus_rate.basis_points(),
            quick_flip_days: tier.quick_flip_days,
            early_access: tier.benefits.early_access,
            free_shipping: tier.benefits.free_shipping,
            exclusive_events: tier.benefits.exclusive_events,
        }
    }
}

/// Active tier catalog.
#[derive(Debug, Clone, Serialize)]
pub struct TierListResponse {
    pub tiers: Vec<TierResponse>,
}

/// Tier selection result: the member plus the hosted checkout URL.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub member: MemberResponse,
    pub checkout_url: String,
    /// Unix seconds.
    pub expires_at: i64,
}

/// Subscription details within the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionResponse {
    pub payment_status: String,
    pub current_period_start: String,
    pub current_period_end: String,
    pub cancel_at_period_end: bool,
}

impl From<&Subscription> for SubscriptionResponse {
    fn from(sub: &Subscription) -> Self {
        Self {
            payment_status: sub.payment_status.as_str().to_string(),
            current_period_start: sub.current_period_start.as_datetime().to_rfc3339(),
            current_period_end: sub.current_period_end.as_datetime().to_rfc3339(),
            cancel_at_period_end: sub.cancel_at_period_end,
        }
    }
}

/// One ledger entry.
#[derive(Debug, Clone, Serialize)]
pub struct BonusTransactionResponse {
    pub id: String,
    pub item_reference: Option<String>,
    pub batch_id: Option<i64>,
    pub amount_cents: i64,
    pub transaction_type: String,
    pub created_at: String,
}

impl From<&BonusTransaction> for BonusTransactionResponse {
    fn from(tx: &BonusTransaction) -> Self {
        Self {
            id: tx.id.to_string(),
            item_reference: tx.item_reference.clone(),
            batch_id: tx.batch_id.map(|b| b.value()),
            amount_cents: tx.amount.cents(),
            transaction_type: tx.transaction_type.as_str().to_string(),
            created_at: tx.created_at.as_datetime().to_rfc3339(),
        }
    }
}

/// One page of bonus history.
#[derive(Debug, Clone, Serialize)]
pub struct BonusHistoryResponse {
    pub entries: Vec<BonusTransactionResponse>,
    pub total_bonus_cents: i64,
    pub limit: u32,
    pub offset: u32,
}

/// One trade-in batch.
#[derive(Debug, Clone, Serialize)]
pub struct TradeInBatchResponse {
    pub id: i64,
    pub reference_code: String,
    pub status: String,
    pub item_count: u32,
    pub trade_value_cents: i64,
    pub received_at: String,
}

impl From<&TradeInBatch> for TradeInBatchResponse {
    fn from(batch: &TradeInBatch) -> Self {
        Self {
            id: batch.id.value(),
            reference_code: batch.reference_code.clone(),
            status: batch.status.as_str().to_string(),
            item_count: batch.item_count,
            trade_value_cents: batch.trade_value.cents(),
            received_at: batch.received_at.as_datetime().to_rfc3339(),
        }
    }
}

/// Store-credit balance view.
#[derive(Debug, Clone, Serialize)]
pub struct StoreCreditResponse {
    pub amount_cents: i64,
    pub currency: String,
    /// True when the balance could not be refreshed from the commerce
    /// platform and may be out of date.
    pub stale: bool,
}

impl From<&StoreCreditBalance> for StoreCreditResponse {
    fn from(balance: &StoreCreditBalance) -> Self {
        Self {
            amount_cents: balance.amount.cents(),
            currency: balance.currency.clone(),
            stale: balance.stale,
        }
    }
}

/// Aggregated member dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardResponse {
    pub member: MemberResponse,
    pub subscription: Option<SubscriptionResponse>,
    pub recent_bonuses: Vec<BonusTransactionResponse>,
    pub total_bonus_cents: i64,
    pub recent_batches: Vec<TradeInBatchResponse>,
    pub store_credit: StoreCreditResponse,
    /// True when any sub-fetch fell back to its default.
    pub degraded: bool,
}

impl From<&MemberDashboard> for DashboardResponse {
    fn from(dashboard: &MemberDashboard) -> Self {
        Self {
            member: MemberResponse::from(&dashboard.member),
            subscription: dashboard.subscription.as_ref().map(SubscriptionResponse::from),
            recent_bonuses: dashboard
                .recent_bonuses
                .iter()
                .map(BonusTransactionResponse::from)
                .collect(),
            total_bonus_cents: dashboard.total_bonus.cents(),
            recent_batches: dashboard
                .recent_batches
                .iter()
                .map(TradeInBatchResponse::from)
                .collect(),
            store_credit: StoreCreditResponse::from(&dashboard.store_credit),
            degraded: dashboard.degraded,
        }
    }
}

/// Result of crediting one sale.
#[derive(Debug, Clone, Serialize)]
pub struct TradeInSaleResponse {
    pub transaction: BonusTransactionResponse,
    /// False when the ledger already held this entry.
    pub recorded: bool,
}

/// Result of pushing a batch's credit.
#[derive(Debug, Clone, Serialize)]
pub struct CreditBatchResponse {
    pub batch: TradeInBatchResponse,
    pub amount_pushed_cents: i64,
}

/// Webhook acknowledgment.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    pub disposition: String,
}

/// Standard error body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error_code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}
