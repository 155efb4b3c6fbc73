//! Axum router configuration for the loyalty API.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    cancel_subscription, change_tier, credit_batch, get_bonus_history, get_dashboard,
    get_store_credit, handle_payment_webhook, list_tiers, reactivate_subscription,
    record_trade_in_sale, select_tier, signup, LoyaltyAppState,
};

/// Member-facing routes.
///
/// - `POST /signup` - create an account
/// - `GET /tiers` - list active tiers
/// - `POST /members/:id/tier` - select a tier and start checkout
/// - `POST /members/:id/tier-change` - move an active member to another tier
/// - `POST /members/:id/cancel` - cancel (immediate or at period end)
/// - `POST /members/:id/reactivate` - undo a scheduled cancellation
/// - `GET /members/:id/dashboard` - aggregated dashboard
/// - `GET /members/:id/bonuses` - paginated bonus history
/// - `GET /members/:id/store-credit` - commerce-platform balance view
pub fn member_routes() -> Router<LoyaltyAppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/tiers", get(list_tiers))
        .route("/members/:id/tier", post(select_tier))
        .route("/members/:id/tier-change", post(change_tier))
        .route("/members/:id/cancel", post(cancel_subscription))
        .route("/members/:id/reactivate", post(reactivate_subscription))
        .route("/members/:id/dashboard", get(get_dashboard))
        .route("/members/:id/bonuses", get(get_bonus_history))
        .route("/members/:id/store-credit", get(get_store_credit))
}

/// Staff routes for the trade-in crediting pipeline.
///
/// - `POST /sales` - record a trade-in item sale (idempotent)
/// - `POST /:id/credit` - push a priced batch's total as store credit
pub fn trade_in_routes() -> Router<LoyaltyAppState> {
    Router::new()
        .route("/sales", post(record_trade_in_sale))
        .route("/:id/credit", post(credit_batch))
}

/// Webhook routes. No session auth; requests are authenticated by the
/// processor signature over the raw body.
///
/// - `POST /payment` - payment processor events
pub fn webhook_routes() -> Router<LoyaltyAppState> {
    Router::new().route("/payment", post(handle_payment_webhook))
}

/// Complete loyalty router, suitable for nesting under `/api`.
pub fn loyalty_router() -> Router<LoyaltyAppState> {
    Router::new()
        .merge(member_routes())
        .nest("/trade-ins", trade_in_routes())
        .nest("/webhooks", webhook_routes())
}
