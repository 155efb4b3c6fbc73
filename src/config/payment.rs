//! Payment processor configuration.

use serde::Deserialize;

use super::error::ValidationError;

/// Stripe configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentConfig {
    /// Stripe secret API key.
    pub stripe_api_key: String,

    /// Stripe webhook signing secret.
    pub stripe_webhook_secret: String,

    /// Stripe product the membership prices hang off.
    pub stripe_product_id: String,

    /// ISO currency code for checkout, lowercase.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Reject test-mode webhook events. Enable in production.
    #[serde(default)]
    pub require_livemode: bool,
}

impl PaymentConfig {
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_test_")
    }

    pub fn is_live_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_live_")
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stripe_api_key.is_empty() {
            return Err(ValidationError::MissingRequired(
                "PAYMENT__STRIPE_API_KEY",
            ));
        }
        if self.stripe_webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired(
                "PAYMENT__STRIPE_WEBHOOK_SECRET",
            ));
        }
        if self.stripe_product_id.is_empty() {
            return Err(ValidationError::MissingRequired(
                "PAYMENT__STRIPE_PRODUCT_ID",
            ));
        }
        if !self.stripe_api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !self.stripe_webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        Ok(())
    }
}

fn default_currency() -> String {
    "usd".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> PaymentConfig {
        PaymentConfig {
            stripe_api_key: "sk_test_abc".to_string(),
            stripe_webhook_secret: "whsec_xyz".to_string(),
            stripe_product_id: "prod_membership".to_string(),
            currency: default_currency(),
            require_livemode: false,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_mode_detected_from_key_prefix() {
        let config = valid();
        assert!(config.is_test_mode());
        assert!(!config.is_live_mode());
    }

    #[test]
    fn missing_fields_are_rejected() {
        assert!(PaymentConfig::default().validate().is_err());
    }

    #[test]
    fn publishable_key_is_rejected() {
        let config = PaymentConfig {
            stripe_api_key: "pk_test_abc".to_string(),
            ..valid()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_webhook_secret_prefix_is_rejected() {
        let config = PaymentConfig {
            stripe_webhook_secret: "secret_xyz".to_string(),
            ..valid()
        };
        assert!(config.validate().is_err());
    }
}
