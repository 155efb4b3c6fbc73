//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` trait against the Stripe REST API.
//! Handles customer creation, hosted checkout sessions, subscription
//! lifecycle calls, and webhook verification.
//!
//! # Security
//!
//! - HMAC-SHA256 signature verification with constant-time comparison
//! - Timestamp validation (5-minute window) for replay attack prevention
//! - Secrets handled via `secrecy::SecretString`

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::foundation::{MemberId, Money};
use crate::ports::{
    CheckoutRequest, CheckoutSession, PaymentError, PaymentErrorCode, PaymentProvider,
    ProcessorSubscription, ProcessorSubscriptionStatus, WebhookEvent, WebhookEventType,
};

use super::webhook_types::{
    hex_encode, SignatureHeader, StripeCheckoutSession, StripeCustomer, StripeInvoice,
    StripeSubscription, StripeWebhookEvent,
};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age for webhook events (5 minutes).
const MAX_TIMESTAMP_AGE_SECS: i64 = 300;

/// Clock skew tolerance for future timestamps (60 seconds).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// Product id tier prices are created against.
    product_id: String,

    /// Lowercase ISO currency for subscription prices.
    currency: String,

    /// Whether to reject test-mode webhook events.
    require_livemode: bool,
}

impl StripeConfig {
    /// Create a new Stripe configuration.
    pub fn new(
        api_key: impl Into<String>,
        webhook_secret: impl Into<String>,
        product_id: impl Into<String>,
    ) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            webhook_secret: SecretString::new(webhook_secret.into()),
            api_base_url: "https://api.stripe.com".to_string(),
            product_id: product_id.into(),
            currency: "usd".to_string(),
            require_livemode: false,
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Set the subscription currency (lowercase ISO code).
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Require livemode events in production.
    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }
}

/// Stripe payment provider adapter.
pub struct StripePaymentAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripePaymentAdapter {
    /// Create a new Stripe adapter with the given configuration.
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Verify webhook signature using HMAC-SHA256.
    ///
    /// Uses constant-time comparison and rejects events outside the replay
    /// tolerance window.
    fn verify_signature(
        &self,
        payload: &[u8],
        header: &SignatureHeader,
    ) -> Result<(), PaymentError> {
        let now = chrono::Utc::now().timestamp();
        let age = now - header.timestamp;

        if age > MAX_TIMESTAMP_AGE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                age_secs = age,
                "Webhook event too old - possible replay attack"
            );
            return Err(PaymentError::invalid_webhook(format!(
                "Event too old ({} seconds)",
                age
            )));
        }

        if age < -MAX_FUTURE_TOLERANCE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                "Webhook event from future - clock skew or manipulation"
            );
            return Err(PaymentError::invalid_webhook("Event timestamp in future"));
        }

        let signed_payload = format!("{}.{}", header.timestamp, String::from_utf8_lossy(payload));

        let mut mac =
            HmacSha256::new_from_slice(self.config.webhook_secret.expose_secret().as_bytes())
                .map_err(|_| PaymentError::invalid_webhook("Webhook secret unusable as HMAC key"))?;

        mac.update(signed_payload.as_bytes());
        let expected = mac.finalize().into_bytes();

        let expected_bytes: &[u8] = expected.as_slice();
        let provided_bytes: &[u8] = &header.v1_signature;

        if expected_bytes.ct_eq(provided_bytes).unwrap_u8() != 1 {
            tracing::warn!(
                expected_signature = hex_encode(expected_bytes),
                "Invalid webhook signature"
            );
            return Err(PaymentError::invalid_webhook("Invalid signature"));
        }

        Ok(())
    }

    /// Parse a Stripe event envelope and flatten it to a domain event.
    fn parse_event(&self, payload: &[u8]) -> Result<WebhookEvent, PaymentError> {
        let stripe_event: StripeWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse webhook payload");
            PaymentError::invalid_webhook(format!("Invalid JSON: {}", e))
        })?;

        if self.config.require_livemode && !stripe_event.livemode {
            tracing::warn!(
                event_id = %stripe_event.id,
                "Rejected test mode event in production"
            );
            return Err(PaymentError::invalid_webhook(
                "Test mode events not allowed in production",
            ));
        }

        let event_type = match stripe_event.event_type.as_str() {
            "checkout.session.completed" => WebhookEventType::CheckoutSessionCompleted,
            "invoice.paid" => WebhookEventType::InvoicePaid,
            "invoice.payment_failed" => WebhookEventType::InvoicePaymentFailed,
            "customer.subscription.deleted" => WebhookEventType::SubscriptionDeleted,
            "customer.subscription.updated" => WebhookEventType::SubscriptionUpdated,
            other => WebhookEventType::Unknown(other.to_string()),
        };

        let mut event = WebhookEvent {
            id: stripe_event.id.clone(),
            event_type,
            customer_id: None,
            subscription_id: None,
            session_id: None,
            member_id: None,
            period_start: None,
            period_end: None,
            cancel_at_period_end: None,
            created_at: stripe_event.created,
        };

        match stripe_event.event_type.as_str() {
            "checkout.session.completed" => {
                let session: StripeCheckoutSession =
                    serde_json::from_value(stripe_event.data.object).map_err(|e| {
                        PaymentError::invalid_webhook(format!("Invalid checkout session: {}", e))
                    })?;

                event.session_id = Some(session.id);
                event.customer_id = session.customer;
                event.subscription_id = session.subscription;
                event.member_id = parse_member_id(session.metadata.get("member_id"));
            }

            s if s.starts_with("customer.subscription.") => {
                let sub: StripeSubscription = serde_json::from_value(stripe_event.data.object)
                    .map_err(|e| {
                        PaymentError::invalid_webhook(format!("Invalid subscription: {}", e))
                    })?;

                event.subscription_id = Some(sub.id);
                event.customer_id = Some(sub.customer);
                event.period_start = Some(sub.current_period_start);
                event.period_end = Some(sub.current_period_end);
                event.cancel_at_period_end = Some(sub.cancel_at_period_end);
                event.member_id = parse_member_id(sub.metadata.get("member_id"));
            }

            s if s.starts_with("invoice.") => {
                let invoice: StripeInvoice = serde_json::from_value(stripe_event.data.object)
                    .map_err(|e| {
                        PaymentError::invalid_webhook(format!("Invalid invoice: {}", e))
                    })?;

                let (start, end) = invoice.billing_period();
                event.customer_id = Some(invoice.customer);
                event.subscription_id = invoice.subscription;
                event.period_start = start;
                event.period_end = end;
            }

            _ => {
                // Unknown events carry only the envelope fields.
            }
        }

        Ok(event)
    }

    /// Inline price parameters for a monthly recurring price.
    ///
    /// Prices are created ad hoc via `price_data` so tier repricing never
    /// requires pre-provisioned price objects.
    fn price_data_params(&self, prefix: &str, monthly_price: Money) -> Vec<(String, String)> {
        vec![
            (
                format!("{}[price_data][currency]", prefix),
                self.config.currency.clone(),
            ),
            (
                format!("{}[price_data][product]", prefix),
                self.config.product_id.clone(),
            ),
            (
                format!("{}[price_data][unit_amount]", prefix),
                monthly_price.cents().to_string(),
            ),
            (
                format!("{}[price_data][recurring][interval]", prefix),
                "month".to_string(),
            ),
        ]
    }

    async fn post_form(
        &self,
        url: &str,
        params: &[(String, String)],
        idempotency_key: Option<&str>,
    ) -> Result<reqwest::Response, PaymentError> {
        let mut request = self
            .http_client
            .post(url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(params);

        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        check_status(response).await
    }

    async fn get_stripe_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<StripeSubscription>, PaymentError> {
        let url = format!(
            "{}/v1/subscriptions/{}",
            self.config.api_base_url, subscription_id
        );

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = check_status(response).await?;
        Ok(Some(parse_json(response).await?))
    }
}

/// Reject non-2xx responses, preserving the Stripe error body.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, PaymentError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_default();
    tracing::error!(status = %status, error = %error_text, "Stripe API call failed");

    let code = match status.as_u16() {
        401 | 403 => PaymentErrorCode::AuthenticationError,
        402 => PaymentErrorCode::CardDeclined,
        404 => PaymentErrorCode::NotFound,
        429 => PaymentErrorCode::RateLimitExceeded,
        _ => PaymentErrorCode::ProviderError,
    };

    Err(PaymentError::new(
        code,
        format!("Stripe API error: {}", error_text),
    ))
}

async fn parse_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, PaymentError> {
    response.json().await.map_err(|e| {
        PaymentError::new(
            PaymentErrorCode::ProviderError,
            format!("Failed to parse Stripe response: {}", e),
        )
    })
}

fn parse_member_id(raw: Option<&String>) -> Option<MemberId> {
    raw.and_then(|s| s.parse::<i64>().ok()).map(MemberId::new)
}

fn map_subscription(sub: StripeSubscription) -> ProcessorSubscription {
    let status = match sub.status.as_str() {
        "active" | "trialing" => ProcessorSubscriptionStatus::Active,
        "past_due" | "unpaid" => ProcessorSubscriptionStatus::PastDue,
        "canceled" | "incomplete_expired" => ProcessorSubscriptionStatus::Canceled,
        "incomplete" => ProcessorSubscriptionStatus::Incomplete,
        _ => ProcessorSubscriptionStatus::Unknown,
    };

    ProcessorSubscription {
        id: sub.id,
        customer_id: sub.customer,
        status,
        current_period_start: sub.current_period_start,
        current_period_end: sub.current_period_end,
        cancel_at_period_end: sub.cancel_at_period_end,
    }
}

#[async_trait]
impl PaymentProvider for StripePaymentAdapter {
    async fn create_customer(
        &self,
        member_id: MemberId,
        email: &str,
        name: Option<&str>,
    ) -> Result<String, PaymentError> {
        let url = format!("{}/v1/customers", self.config.api_base_url);

        let mut params = vec![
            ("email".to_string(), email.to_string()),
            ("metadata[member_id]".to_string(), member_id.to_string()),
        ];
        if let Some(name) = name {
            params.push(("name".to_string(), name.to_string()));
        }

        let response = self.post_form(&url, &params, None).await?;
        let customer: StripeCustomer = parse_json(response).await?;

        Ok(customer.id)
    }

    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);

        let mut params = vec![
            ("mode".to_string(), "subscription".to_string()),
            ("customer".to_string(), request.customer_id.clone()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
            (
                "metadata[member_id]".to_string(),
                request.member_id.to_string(),
            ),
            (
                "subscription_data[metadata][member_id]".to_string(),
                request.member_id.to_string(),
            ),
        ];
        params.extend(self.price_data_params("line_items[0]", request.monthly_price));

        let response = self
            .post_form(&url, &params, request.idempotency_key.as_deref())
            .await?;
        let session: StripeCheckoutSession = parse_json(response).await?;

        // Checkout sessions expire after 24 hours unless Stripe says otherwise.
        let expires_at = session
            .expires_at
            .unwrap_or_else(|| chrono::Utc::now().timestamp() + 24 * 60 * 60);

        let checkout_url = session
            .url
            .ok_or_else(|| {
                PaymentError::new(
                    PaymentErrorCode::ProviderError,
                    "Checkout session response missing URL",
                )
            })?;

        Ok(CheckoutSession {
            id: session.id,
            url: checkout_url,
            expires_at,
        })
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<ProcessorSubscription>, PaymentError> {
        Ok(self
            .get_stripe_subscription(subscription_id)
            .await?
            .map(map_subscription))
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
        at_period_end: bool,
    ) -> Result<ProcessorSubscription, PaymentError> {
        let url = format!(
            "{}/v1/subscriptions/{}",
            self.config.api_base_url, subscription_id
        );

        let response = if at_period_end {
            let params = vec![(
                "cancel_at_period_end".to_string(),
                "true".to_string(),
            )];
            self.post_form(&url, &params, None).await?
        } else {
            let response = self
                .http_client
                .delete(&url)
                .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
                .send()
                .await
                .map_err(|e| PaymentError::network(e.to_string()))?;
            check_status(response).await?
        };

        let sub: StripeSubscription = parse_json(response).await?;
        Ok(map_subscription(sub))
    }

    async fn resume_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProcessorSubscription, PaymentError> {
        let url = format!(
            "{}/v1/subscriptions/{}",
            self.config.api_base_url, subscription_id
        );

        let params = vec![(
            "cancel_at_period_end".to_string(),
            "false".to_string(),
        )];
        let response = self.post_form(&url, &params, None).await?;

        let sub: StripeSubscription = parse_json(response).await?;
        Ok(map_subscription(sub))
    }

    async fn change_subscription_price(
        &self,
        subscription_id: &str,
        monthly_price: Money,
    ) -> Result<ProcessorSubscription, PaymentError> {
        // The existing item id is needed so the update replaces the price
        // rather than adding a second line.
        let current = self
            .get_stripe_subscription(subscription_id)
            .await?
            .ok_or_else(|| PaymentError::not_found("Subscription"))?;

        let item_id = current
            .items
            .data
            .first()
            .map(|item| item.id.clone())
            .ok_or_else(|| {
                PaymentError::new(
                    PaymentErrorCode::ProviderError,
                    "Subscription has no items to reprice",
                )
            })?;

        let url = format!(
            "{}/v1/subscriptions/{}",
            self.config.api_base_url, subscription_id
        );

        let mut params = vec![
            ("items[0][id]".to_string(), item_id),
            // Tier changes take effect on the next invoice.
            ("proration_behavior".to_string(), "none".to_string()),
        ];
        params.extend(self.price_data_params("items[0]", monthly_price));

        let response = self.post_form(&url, &params, None).await?;
        let sub: StripeSubscription = parse_json(response).await?;
        Ok(map_subscription(sub))
    }

    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, PaymentError> {
        let header = SignatureHeader::parse(signature).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse Stripe-Signature header");
            PaymentError::invalid_webhook(e.to_string())
        })?;

        self.verify_signature(payload, &header)?;

        let event = self.parse_event(payload)?;

        tracing::info!(
            event_id = %event.id,
            event_type = ?event.event_type,
            "Webhook signature verified"
        );

        Ok(event)
    }
}
