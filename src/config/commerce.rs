//! Commerce platform (store credit) configuration.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::reconciliation::RetryPolicy;

/// Shopify store-credit gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CommerceConfig {
    /// Admin API access token.
    pub shopify_access_token: String,

    /// Admin API base URL, e.g.
    /// `https://shop.myshopify.com/admin/api/2024-01`.
    pub api_base_url: String,

    /// Maximum store-credit push attempts before alerting.
    #[serde(default = "default_retry_attempts")]
    pub retry_max_attempts: u32,

    /// First retry delay in milliseconds; doubles per attempt.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Delay ceiling in seconds.
    #[serde(default = "default_retry_max_delay_secs")]
    pub retry_max_delay_secs: u64,
}

impl CommerceConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_secs(self.retry_max_delay_secs),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.shopify_access_token.is_empty() {
            return Err(ValidationError::MissingRequired(
                "COMMERCE__SHOPIFY_ACCESS_TOKEN",
            ));
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(ValidationError::InvalidCommerceUrl);
        }
        if self.retry_max_attempts == 0 || self.retry_max_attempts > 10 {
            return Err(ValidationError::InvalidRetryAttempts);
        }
        Ok(())
    }
}

impl Default for CommerceConfig {
    fn default() -> Self {
        Self {
            shopify_access_token: String::new(),
            api_base_url: String::new(),
            retry_max_attempts: default_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_secs: default_retry_max_delay_secs(),
        }
    }
}

fn default_retry_attempts() -> u32 {
    4
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_retry_max_delay_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> CommerceConfig {
        CommerceConfig {
            shopify_access_token: "shpat_abc".to_string(),
            api_base_url: "https://shop.myshopify.com/admin/api/2024-01".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn empty_token_is_rejected() {
        assert!(CommerceConfig::default().validate().is_err());
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        let config = CommerceConfig {
            api_base_url: "ftp://shop.example.com".to_string(),
            ..valid()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn retry_policy_carries_bounds() {
        let policy = valid().retry_policy();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.base_delay, Duration::from_millis(500));
        assert_eq!(policy.max_delay, Duration::from_secs(30));
    }

    #[test]
    fn zero_retry_attempts_is_rejected() {
        let config = CommerceConfig {
            retry_max_attempts: 0,
            ..valid()
        };
        assert!(config.validate().is_err());
    }
}
