//! Service entry point: configuration, pool, adapter wiring, HTTP server.

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use quickflip_loyalty::adapters::http::{loyalty_router, LoyaltyAppState};
use quickflip_loyalty::adapters::postgres::{
    PostgresLedgerStore, PostgresMemberRepository, PostgresSubscriptionRepository,
    PostgresTierRegistry, PostgresTradeInRepository,
};
use quickflip_loyalty::adapters::reconciliation::{
    RetryingStoreCreditGateway, TracingAlertNotifier, WebhookRouter,
};
use quickflip_loyalty::adapters::shopify::{ShopifyConfig, ShopifyStoreCreditClient};
use quickflip_loyalty::adapters::stripe::{StripeConfig, StripePaymentAdapter};
use quickflip_loyalty::application::handlers::membership::ConfirmPaymentHandler;
use quickflip_loyalty::application::MemberLocks;
use quickflip_loyalty::config::AppConfig;
use quickflip_loyalty::ports::{
    AlertNotifier, LedgerStore, MemberRepository, PaymentProvider, StoreCreditGateway,
    SubscriptionRepository, TierRegistry, TradeInRepository,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        tracing::info!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    // Persistence
    let members: Arc<dyn MemberRepository> =
        Arc::new(PostgresMemberRepository::new(pool.clone()));
    let subscriptions: Arc<dyn SubscriptionRepository> =
        Arc::new(PostgresSubscriptionRepository::new(pool.clone()));
    let tiers: Arc<dyn TierRegistry> = Arc::new(PostgresTierRegistry::new(pool.clone()));
    let ledger: Arc<dyn LedgerStore> = Arc::new(PostgresLedgerStore::new(pool.clone()));
    let trade_ins: Arc<dyn TradeInRepository> =
        Arc::new(PostgresTradeInRepository::new(pool.clone()));

    // Payment processor
    let stripe_config = StripeConfig::new(
        config.payment.stripe_api_key.clone(),
        config.payment.stripe_webhook_secret.clone(),
        config.payment.stripe_product_id.clone(),
    )
    .with_currency(config.payment.currency.clone())
    .with_require_livemode(config.payment.require_livemode);
    let payments: Arc<dyn PaymentProvider> = Arc::new(StripePaymentAdapter::new(stripe_config));

    // Store credit, retried with alerting on exhaustion
    let shopify = ShopifyStoreCreditClient::new(
        ShopifyConfig::new(
            config.commerce.shopify_access_token.clone(),
            config.commerce.api_base_url.clone(),
        ),
        members.clone(),
    );
    let alerts: Arc<dyn AlertNotifier> = Arc::new(TracingAlertNotifier::default());
    let store_credit: Arc<dyn StoreCreditGateway> = Arc::new(RetryingStoreCreditGateway::new(
        Arc::new(shopify),
        alerts,
        config.commerce.retry_policy(),
    ));

    // Reconciliation
    let locks = Arc::new(MemberLocks::new());
    let confirm_payment = Arc::new(ConfirmPaymentHandler::new(
        locks.clone(),
        members.clone(),
        subscriptions.clone(),
    ));
    let webhook_router = Arc::new(WebhookRouter::new(
        locks.clone(),
        members.clone(),
        subscriptions.clone(),
        payments.clone(),
        confirm_payment,
    ));

    let state = LoyaltyAppState {
        locks,
        members,
        subscriptions,
        tiers,
        ledger,
        trade_ins,
        payments,
        store_credit,
        webhook_router,
        past_due_policy: config.policy.past_due,
        dashboard_fetch_timeout: config.policy.dashboard_fetch_timeout(),
    };

    let app = Router::new()
        .nest("/api", loyalty_router())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(cors_layer(&config))
        .with_state(state);

    let addr = config.server.socket_addr()?;
    tracing::info!(%addr, "starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if config.server.is_production() {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
