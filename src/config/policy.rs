//! Loyalty program policy knobs.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::member::PastDuePolicy;

/// Program-level policy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Whether past-due members keep earning bonuses.
    #[serde(default)]
    pub past_due: PastDuePolicy,

    /// Per-fetch budget for dashboard sub-queries, in milliseconds.
    #[serde(default = "default_dashboard_fetch_timeout_ms")]
    pub dashboard_fetch_timeout_ms: u64,
}

impl PolicyConfig {
    pub fn dashboard_fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.dashboard_fetch_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(50..=10_000).contains(&self.dashboard_fetch_timeout_ms) {
            return Err(ValidationError::InvalidFetchTimeout);
        }
        Ok(())
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            past_due: PastDuePolicy::default(),
            dashboard_fetch_timeout_ms: default_dashboard_fetch_timeout_ms(),
        }
    }
}

fn default_dashboard_fetch_timeout_ms() -> u64 {
    500
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_continues_crediting() {
        let config = PolicyConfig::default();
        assert_eq!(config.past_due, PastDuePolicy::ContinueCrediting);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn suspend_policy_deserializes() {
        let config: PolicyConfig =
            serde_json::from_str(r#"{"past_due": "suspend_crediting"}"#).unwrap();
        assert_eq!(config.past_due, PastDuePolicy::SuspendCrediting);
    }

    #[test]
    fn out_of_range_timeout_is_rejected() {
        let config = PolicyConfig {
            dashboard_fetch_timeout_ms: 10,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
