//! Shared payment provider mock for membership handler tests.

use crate::domain::foundation::{MemberId, Money};
use crate::ports::{
    CheckoutRequest, CheckoutSession, PaymentError, PaymentErrorCode, PaymentProvider,
    ProcessorSubscription, ProcessorSubscriptionStatus, WebhookEvent,
};
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Default)]
pub(crate) struct RecordingPaymentProvider {
    pub fail_cancel: bool,
    pub fail_resume: bool,
    pub canceled: Mutex<Vec<(String, bool)>>,
    pub resumed: Mutex<Vec<String>>,
}

impl RecordingPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn canceled(&self) -> Vec<(String, bool)> {
        self.canceled.lock().unwrap().clone()
    }

    pub fn resumed(&self) -> Vec<String> {
        self.resumed.lock().unwrap().clone()
    }

    fn subscription(id: &str, cancel_at_period_end: bool) -> ProcessorSubscription {
        ProcessorSubscription {
            id: id.to_string(),
            customer_id: "cus_1".to_string(),
            status: ProcessorSubscriptionStatus::Active,
            current_period_start: 1_700_000_000,
            current_period_end: 1_702_592_000,
            cancel_at_period_end,
        }
    }
}

#[async_trait]
impl PaymentProvider for RecordingPaymentProvider {
    async fn create_customer(
        &self,
        member_id: MemberId,
        _email: &str,
        _name: Option<&str>,
    ) -> Result<String, PaymentError> {
        Ok(format!("cus_{}", member_id))
    }

    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        Ok(CheckoutSession {
            id: format!("cs_{}", request.member_id),
            url: "https://checkout.example.com/cs".to_string(),
            expires_at: 1_700_003_600,
        })
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<ProcessorSubscription>, PaymentError> {
        Ok(Some(Self::subscription(subscription_id, false)))
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
        at_period_end: bool,
    ) -> Result<ProcessorSubscription, PaymentError> {
        if self.fail_cancel {
            return Err(PaymentError::new(
                PaymentErrorCode::ProviderError,
                "cancel failed",
            ));
        }
        self.canceled
            .lock()
            .unwrap()
            .push((subscription_id.to_string(), at_period_end));
        Ok(Self::subscription(subscription_id, at_period_end))
    }

    async fn resume_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProcessorSubscription, PaymentError> {
        if self.fail_resume {
            return Err(PaymentError::new(
                PaymentErrorCode::ProviderError,
                "resume failed",
            ));
        }
        self.resumed.lock().unwrap().push(subscription_id.to_string());
        Ok(Self::subscription(subscription_id, false))
    }

    async fn change_subscription_price(
        &self,
        subscription_id: &str,
        _monthly_price: Money,
    ) -> Result<ProcessorSubscription, PaymentError> {
        Ok(Self::subscription(subscription_id, false))
    }

    async fn verify_webhook(
        &self,
        _payload: &[u8],
        _signature: &str,
    ) -> Result<WebhookEvent, PaymentError> {
        Err(PaymentError::invalid_webhook("not implemented in mock"))
    }
}
