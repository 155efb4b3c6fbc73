//! Application configuration.
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `QUICKFLIP` prefix
//! and nested values use `__` as separator:
//!
//! - `QUICKFLIP__SERVER__PORT=8080` -> `server.port`
//! - `QUICKFLIP__DATABASE__URL=...` -> `database.url`
//! - `QUICKFLIP__POLICY__PAST_DUE=suspend_crediting` -> `policy.past_due`

mod commerce;
mod database;
mod error;
mod payment;
mod policy;
mod server;

pub use commerce::CommerceConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use policy::PolicyConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    pub database: DatabaseConfig,

    pub payment: PaymentConfig,

    pub commerce: CommerceConfig,

    #[serde(default)]
    pub policy: PolicyConfig,
}

impl AppConfig {
    /// Loads configuration from the environment, reading `.env` first when
    /// present.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("QUICKFLIP")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate()?;
        self.commerce.validate()?;
        self.policy.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AppConfig {
        AppConfig {
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: "postgres://localhost/quickflip".to_string(),
                ..Default::default()
            },
            payment: PaymentConfig {
                stripe_api_key: "sk_test_abc".to_string(),
                stripe_webhook_secret: "whsec_xyz".to_string(),
                stripe_product_id: "prod_membership".to_string(),
                currency: "usd".to_string(),
                require_livemode: false,
            },
            commerce: CommerceConfig {
                shopify_access_token: "shpat_abc".to_string(),
                api_base_url: "https://shop.myshopify.com/admin/api/2024-01".to_string(),
                ..Default::default()
            },
            policy: PolicyConfig::default(),
        }
    }

    #[test]
    fn valid_config_validates() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn section_failure_propagates() {
        let mut config = valid();
        config.database.url = String::new();
        assert!(config.validate().is_err());
    }
}
