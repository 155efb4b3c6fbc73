//! Payment provider port for external subscription billing.
//!
//! # Design
//!
//! - **Gateway agnostic**: the interface fits any hosted-checkout processor
//! - **Subscription-focused**: recurring monthly billing per tier
//! - **Idempotent**: operations carry keys and can be safely retried

use crate::domain::foundation::{DomainError, ErrorCode, MemberId, Money};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for payment processor integrations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Creates a customer at the processor, returning its customer id.
    async fn create_customer(
        &self,
        member_id: MemberId,
        email: &str,
        name: Option<&str>,
    ) -> Result<String, PaymentError>;

    /// Creates a hosted checkout session for the member's selected tier.
    ///
    /// Returns a URL for the member to complete payment setup.
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Fetches a processor subscription by its id.
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<ProcessorSubscription>, PaymentError>;

    /// Cancels a subscription.
    ///
    /// With `at_period_end` the subscription stays active until the period
    /// boundary; otherwise it terminates immediately.
    async fn cancel_subscription(
        &self,
        subscription_id: &str,
        at_period_end: bool,
    ) -> Result<ProcessorSubscription, PaymentError>;

    /// Clears a scheduled cancellation before the period boundary.
    async fn resume_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProcessorSubscription, PaymentError>;

    /// Moves a subscription to a different monthly price.
    async fn change_subscription_price(
        &self,
        subscription_id: &str,
        monthly_price: Money,
    ) -> Result<ProcessorSubscription, PaymentError>;

    /// Verifies a webhook signature and parses the event.
    ///
    /// # Errors
    ///
    /// - `InvalidWebhook` if the signature does not verify or the event is
    ///   outside the replay tolerance window
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, PaymentError>;
}

/// Request to create a checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub member_id: MemberId,
    pub customer_id: String,
    pub email: String,

    /// Monthly price of the selected tier.
    pub monthly_price: Money,

    /// Tier name shown on the processor's checkout page.
    pub tier_name: String,

    pub success_url: String,
    pub cancel_url: String,

    /// Idempotency key for safe retries.
    pub idempotency_key: Option<String>,
}

/// Hosted checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Processor's session id.
    pub id: String,

    /// URL for the member to complete checkout.
    pub url: String,

    /// When the session expires (Unix timestamp).
    pub expires_at: i64,
}

/// Subscription as reported by the processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorSubscription {
    pub id: String,
    pub customer_id: String,
    pub status: ProcessorSubscriptionStatus,
    pub current_period_start: i64,
    pub current_period_end: i64,
    pub cancel_at_period_end: bool,
}

/// Processor-side subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorSubscriptionStatus {
    Active,
    PastDue,
    Canceled,
    Incomplete,
    Unknown,
}

/// Webhook event types the reconciliation layer acts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    /// Payment setup completed; member becomes active.
    CheckoutSessionCompleted,

    /// Renewal invoice paid; refreshes the billing period and recovers
    /// past-due members.
    InvoicePaid,

    /// Payment attempt failed; member goes past due.
    InvoicePaymentFailed,

    /// Subscription fully terminated at the processor.
    SubscriptionDeleted,

    /// Subscription attributes changed (scheduled cancel, price).
    SubscriptionUpdated,

    /// Anything else; logged and ignored.
    Unknown(String),
}

/// Verified webhook event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Event id from the processor, used for dedupe logging.
    pub id: String,

    pub event_type: WebhookEventType,

    /// Processor customer id the event concerns.
    pub customer_id: Option<String>,

    /// Processor subscription id the event concerns.
    pub subscription_id: Option<String>,

    /// Checkout session id, present on checkout events.
    pub session_id: Option<String>,

    /// Internal member id carried in checkout metadata.
    pub member_id: Option<MemberId>,

    /// Billing period bounds, present on invoice and subscription events.
    pub period_start: Option<i64>,
    pub period_end: Option<i64>,

    pub cancel_at_period_end: Option<bool>,

    /// When the event occurred (Unix timestamp).
    pub created_at: i64,
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    pub code: PaymentErrorCode,
    pub message: String,

    /// Processor's own error code, when available.
    pub provider_code: Option<String>,

    pub retryable: bool,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(
            PaymentErrorCode::NotFound,
            format!("{} not found", resource),
        )
    }

    pub fn invalid_webhook(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidWebhook, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        let code = match err.code {
            PaymentErrorCode::CardDeclined => ErrorCode::PaymentFailed,
            PaymentErrorCode::InvalidWebhook => ErrorCode::InvalidWebhookSignature,
            PaymentErrorCode::NotFound => ErrorCode::SubscriptionNotFound,
            _ => ErrorCode::ExternalUnavailable,
        };
        DomainError::new(code, err.message).with_detail("system", "payment_processor")
    }
}

/// Payment error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    NetworkError,
    AuthenticationError,
    CardDeclined,
    NotFound,
    RateLimitExceeded,
    InvalidWebhook,
    ProviderError,
    Unknown,
}

impl PaymentErrorCode {
    /// Whether the operation is typically safe to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::CardDeclined => "card_declined",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::InvalidWebhook => "invalid_webhook",
            PaymentErrorCode::ProviderError => "provider_error",
            PaymentErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}
