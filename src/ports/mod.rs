//! Ports: trait boundaries between the application core and the outside.
//!
//! Adapters in `crate::adapters` implement these against Postgres, the
//! payment processor, the commerce platform, and in-memory test doubles.

mod alert_notifier;
mod ledger_store;
mod member_repository;
mod payment_provider;
mod store_credit_gateway;
mod tier_registry;
mod trade_in_repository;

pub use alert_notifier::{Alert, AlertNotifier, AlertSeverity};
pub use ledger_store::{AppendOutcome, LedgerStore};
pub use member_repository::{MemberRepository, SubscriptionRepository};
pub use payment_provider::{
    CheckoutRequest, CheckoutSession, PaymentError, PaymentErrorCode, PaymentProvider,
    ProcessorSubscription, ProcessorSubscriptionStatus, WebhookEvent, WebhookEventType,
};
pub use store_credit_gateway::StoreCreditGateway;
pub use tier_registry::TierRegistry;
pub use trade_in_repository::TradeInRepository;
