//! Reconciliation layer between external systems and local state.
//!
//! Routes verified processor webhooks into membership state, and wraps the
//! store-credit gateway with retry and alerting so eventual consistency with
//! the commerce platform is driven to convergence.

mod alerting;
mod retry;
mod retrying_gateway;
mod webhook_router;

pub use alerting::TracingAlertNotifier;
pub use retry::RetryPolicy;
pub use retrying_gateway::RetryingStoreCreditGateway;
pub use webhook_router::{WebhookDisposition, WebhookRouter};
