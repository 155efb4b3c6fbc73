//! Operational alerting port.
//!
//! Raised when retries against an external system are exhausted. An
//! unreconciled bonus is real member-owed value, so exhaustion is never
//! silently dropped.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

/// Operational alert payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub severity: AlertSeverity,

    /// Short machine-matchable name, e.g. `store_credit_push_failed`.
    pub kind: String,

    pub message: String,
}

impl Alert {
    pub fn critical(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: AlertSeverity::Critical,
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn warning(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: AlertSeverity::Warning,
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Port for the operational alerting collaborator.
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    /// Delivers an alert. Best effort; failures are logged, not propagated.
    async fn notify(&self, alert: Alert);
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn alert_notifier_is_object_safe() {
        fn _accepts_dyn(_notifier: &dyn AlertNotifier) {}
    }
}
