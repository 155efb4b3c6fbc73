//! HTTP handlers for the loyalty API.
//!
//! Thin glue between axum routes and the application layer: extract,
//! delegate, map errors to statuses. No business rules live here.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::adapters::reconciliation::{WebhookDisposition, WebhookRouter};
use crate::application::handlers::bonus::{
    CreditBatchCommand, CreditBatchHandler, CreditTradeInSaleCommand, CreditTradeInSaleHandler,
    GetBonusHistoryHandler, GetBonusHistoryQuery,
};
use crate::application::handlers::dashboard::GetDashboardHandler;
use crate::application::handlers::membership::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, ChangeTierCommand, ChangeTierHandler,
    ReactivateSubscriptionCommand, ReactivateSubscriptionHandler, SelectTierCommand,
    SelectTierHandler, SignupCommand, SignupHandler,
};
use crate::application::MemberLocks;
use crate::domain::foundation::{BatchId, MemberId, Money, TierId, Timestamp};
use crate::domain::member::{MemberError, PastDuePolicy};
use crate::ports::{
    LedgerStore, MemberRepository, PaymentErrorCode, PaymentProvider, StoreCreditGateway,
    SubscriptionRepository, TierRegistry, TradeInRepository,
};

use super::dto::{
    BonusHistoryParams, BonusHistoryResponse, BonusTransactionResponse, CancelRequest,
    ChangeTierRequest, CheckoutResponse, CreditBatchResponse, DashboardResponse, ErrorResponse,
    MemberResponse, SelectTierRequest, SignupRequest, StoreCreditResponse, TierListResponse,
    TierResponse, TradeInBatchResponse, TradeInSaleRequest, TradeInSaleResponse,
    WebhookAckResponse,
};

/// Shared application state, cloned per request.
#[derive(Clone)]
pub struct LoyaltyAppState {
    pub locks: Arc<MemberLocks>,
    pub members: Arc<dyn MemberRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub tiers: Arc<dyn TierRegistry>,
    pub ledger: Arc<dyn LedgerStore>,
    pub trade_ins: Arc<dyn TradeInRepository>,
    pub payments: Arc<dyn PaymentProvider>,
    pub store_credit: Arc<dyn StoreCreditGateway>,
    pub webhook_router: Arc<WebhookRouter>,
    pub past_due_policy: PastDuePolicy,
    pub dashboard_fetch_timeout: Duration,
}

impl LoyaltyAppState {
    fn signup_handler(&self) -> SignupHandler {
        SignupHandler::new(self.members.clone())
    }

    fn select_tier_handler(&self) -> SelectTierHandler {
        SelectTierHandler::new(
            self.locks.clone(),
            self.members.clone(),
            self.subscriptions.clone(),
            self.tiers.clone(),
            self.payments.clone(),
        )
    }

    fn change_tier_handler(&self) -> ChangeTierHandler {
        ChangeTierHandler::new(
            self.locks.clone(),
            self.members.clone(),
            self.subscriptions.clone(),
            self.tiers.clone(),
            self.payments.clone(),
        )
    }

    fn cancel_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(
            self.locks.clone(),
            self.members.clone(),
            self.subscriptions.clone(),
            self.payments.clone(),
        )
    }

    fn reactivate_handler(&self) -> ReactivateSubscriptionHandler {
        ReactivateSubscriptionHandler::new(
            self.locks.clone(),
            self.members.clone(),
            self.subscriptions.clone(),
            self.payments.clone(),
        )
    }

    fn dashboard_handler(&self) -> GetDashboardHandler {
        GetDashboardHandler::new(
            self.members.clone(),
            self.subscriptions.clone(),
            self.ledger.clone(),
            self.trade_ins.clone(),
            self.store_credit.clone(),
            self.dashboard_fetch_timeout,
        )
    }

    fn bonus_history_handler(&self) -> GetBonusHistoryHandler {
        GetBonusHistoryHandler::new(self.members.clone(), self.ledger.clone())
    }

    fn credit_sale_handler(&self) -> CreditTradeInSaleHandler {
        CreditTradeInSaleHandler::new(
            self.members.clone(),
            self.tiers.clone(),
            self.ledger.clone(),
            self.past_due_policy,
        )
    }

    fn credit_batch_handler(&self) -> CreditBatchHandler {
        CreditBatchHandler::new(
            self.trade_ins.clone(),
            self.ledger.clone(),
            self.store_credit.clone(),
        )
    }
}

// Member endpoints

/// POST /signup
pub async fn signup(
    State(state): State<LoyaltyAppState>,
    Json(request): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let member = state
        .signup_handler()
        .handle(SignupCommand {
            email: request.email,
            password: request.password,
            name: request.name,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(MemberResponse::from(&member))))
}

/// GET /tiers
pub async fn list_tiers(
    State(state): State<LoyaltyAppState>,
) -> Result<impl IntoResponse, ApiError> {
    let tiers = state.tiers.list_active().await?;
    let response = TierListResponse {
        tiers: tiers.iter().map(TierResponse::from).collect(),
    };
    Ok(Json(response))
}

/// POST /members/:id/tier
pub async fn select_tier(
    State(state): State<LoyaltyAppState>,
    Path(member_id): Path<i64>,
    Json(request): Json<SelectTierRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .select_tier_handler()
        .handle(SelectTierCommand {
            member_id: MemberId::new(member_id),
            tier_id: TierId::new(request.tier_id),
            success_url: request.success_url,
            cancel_url: request.cancel_url,
        })
        .await?;

    let response = CheckoutResponse {
        member: MemberResponse::from(&result.member),
        checkout_url: result.checkout_session.url,
        expires_at: result.checkout_session.expires_at,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /members/:id/tier-change
pub async fn change_tier(
    State(state): State<LoyaltyAppState>,
    Path(member_id): Path<i64>,
    Json(request): Json<ChangeTierRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let member = state
        .change_tier_handler()
        .handle(ChangeTierCommand {
            member_id: MemberId::new(member_id),
            tier_id: TierId::new(request.tier_id),
            reason: request.reason.unwrap_or_else(|| "member request".to_string()),
        })
        .await?;

    Ok(Json(MemberResponse::from(&member)))
}

/// POST /members/:id/cancel
pub async fn cancel_subscription(
    State(state): State<LoyaltyAppState>,
    Path(member_id): Path<i64>,
    Json(request): Json<CancelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let member = state
        .cancel_handler()
        .handle(CancelSubscriptionCommand {
            member_id: MemberId::new(member_id),
            immediate: request.immediate,
        })
        .await?;

    Ok(Json(MemberResponse::from(&member)))
}

/// POST /members/:id/reactivate
pub async fn reactivate_subscription(
    State(state): State<LoyaltyAppState>,
    Path(member_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let member = state
        .reactivate_handler()
        .handle(ReactivateSubscriptionCommand {
            member_id: MemberId::new(member_id),
        })
        .await?;

    Ok(Json(MemberResponse::from(&member)))
}

/// GET /members/:id/dashboard
pub async fn get_dashboard(
    State(state): State<LoyaltyAppState>,
    Path(member_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let dashboard = state
        .dashboard_handler()
        .handle(MemberId::new(member_id))
        .await?;

    Ok(Json(DashboardResponse::from(&dashboard)))
}

/// GET /members/:id/bonuses
pub async fn get_bonus_history(
    State(state): State<LoyaltyAppState>,
    Path(member_id): Path<i64>,
    Query(params): Query<BonusHistoryParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .bonus_history_handler()
        .handle(GetBonusHistoryQuery {
            member_id: MemberId::new(member_id),
            limit: params.limit,
            offset: params.offset,
        })
        .await?;

    let response = BonusHistoryResponse {
        entries: page
            .entries
            .iter()
            .map(BonusTransactionResponse::from)
            .collect(),
        total_bonus_cents: page.total_bonus.cents(),
        limit: page.limit,
        offset: page.offset,
    };
    Ok(Json(response))
}

/// GET /members/:id/store-credit
pub async fn get_store_credit(
    State(state): State<LoyaltyAppState>,
    Path(member_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let member_id = MemberId::new(member_id);
    state
        .members
        .find_by_id(member_id)
        .await?
        .ok_or_else(|| MemberError::not_found(member_id))?;

    let balance = state.store_credit.fetch_balance(member_id).await?;
    Ok(Json(StoreCreditResponse::from(&balance)))
}

// Trade-in endpoints (staff surface)

/// POST /trade-ins/sales
pub async fn record_trade_in_sale(
    State(state): State<LoyaltyAppState>,
    Json(request): Json<TradeInSaleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .credit_sale_handler()
        .handle(CreditTradeInSaleCommand {
            member_id: MemberId::new(request.member_id),
            item_reference: request.item_reference,
            batch_id: request.batch_id.map(BatchId::new),
            sale_price: Money::from_cents(request.sale_price_cents),
            trade_value: Money::from_cents(request.trade_value_cents),
            sold_at: Timestamp::from_unix_secs(request.sold_at),
            received_at: Timestamp::from_unix_secs(request.received_at),
        })
        .await?;

    let response = TradeInSaleResponse {
        transaction: BonusTransactionResponse::from(&result.transaction),
        recorded: !result.outcome.is_duplicate(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /trade-ins/:id/credit
pub async fn credit_batch(
    State(state): State<LoyaltyAppState>,
    Path(batch_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .credit_batch_handler()
        .handle(CreditBatchCommand {
            batch_id: BatchId::new(batch_id),
        })
        .await?;

    let response = CreditBatchResponse {
        batch: TradeInBatchResponse::from(&result.batch),
        amount_pushed_cents: result.amount_pushed.cents(),
    };
    Ok(Json(response))
}

// Webhook endpoint

/// POST /webhooks/payment
///
/// Consumes the raw body; the signature covers the exact bytes sent by the
/// processor, so the payload must not pass through JSON extraction first.
pub async fn handle_payment_webhook(
    State(state): State<LoyaltyAppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(MemberError::InvalidWebhookSignature)?;

    let event = state
        .payments
        .verify_webhook(&body, signature)
        .await
        .map_err(|e| match e.code {
            PaymentErrorCode::InvalidWebhook => MemberError::InvalidWebhookSignature,
            _ => MemberError::infrastructure(e.to_string()),
        })?;

    let disposition = state.webhook_router.dispatch(event).await?;
    let disposition = match disposition {
        WebhookDisposition::Applied => "applied",
        WebhookDisposition::Ignored(reason) => {
            tracing::debug!(reason = %reason, "webhook event ignored");
            "ignored"
        }
    };

    Ok(Json(WebhookAckResponse {
        disposition: disposition.to_string(),
    }))
}

// Error handling

/// API error that maps member errors to HTTP responses.
pub struct ApiError(MemberError);

impl From<MemberError> for ApiError {
    fn from(err: MemberError) -> Self {
        Self(err)
    }
}

impl From<crate::domain::foundation::DomainError> for ApiError {
    fn from(err: crate::domain::foundation::DomainError) -> Self {
        Self(MemberError::from(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            MemberError::NotFound(_) => StatusCode::NOT_FOUND,
            MemberError::EmailTaken(_) => StatusCode::CONFLICT,
            MemberError::TierNotFound(_)
            | MemberError::NoSubscription(_)
            | MemberError::NotScheduledForCancellation(_)
            | MemberError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            MemberError::InvalidState { .. } => StatusCode::CONFLICT,
            MemberError::PaymentFailed { .. } => StatusCode::PAYMENT_REQUIRED,
            MemberError::InvalidWebhookSignature => StatusCode::UNAUTHORIZED,
            MemberError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = ErrorResponse::new(self.0.code().to_string(), self.0.message());
        (status, Json(body)).into_response()
    }
}
