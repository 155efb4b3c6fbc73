//! Alert notifier that emits structured log events.
//!
//! Stands in for a pager integration; log shippers match on the
//! `operational_alert` target and the alert kind.

use async_trait::async_trait;

use crate::ports::{Alert, AlertNotifier, AlertSeverity};

/// Alert notifier backed by `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAlertNotifier;

#[async_trait]
impl AlertNotifier for TracingAlertNotifier {
    async fn notify(&self, alert: Alert) {
        match alert.severity {
            AlertSeverity::Critical => {
                tracing::error!(
                    target: "operational_alert",
                    kind = %alert.kind,
                    message = %alert.message,
                    "critical alert"
                );
            }
            AlertSeverity::Warning => {
                tracing::warn!(
                    target: "operational_alert",
                    kind = %alert.kind,
                    message = %alert.message,
                    "warning alert"
                );
            }
        }
    }
}
