//! Member-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NotFound | 404 |
//! | EmailTaken | 409 |
//! | TierNotFound | 400 |
//! | NoSubscription | 400 |
//! | NotScheduledForCancellation | 400 |
//! | InvalidState | 409 |
//! | PaymentFailed | 402 |
//! | InvalidWebhookSignature | 401 |
//! | ValidationFailed | 400 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode, MemberId, TierId};

/// Errors from member lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberError {
    /// Member was not found.
    NotFound(MemberId),

    /// Another account already uses this email.
    EmailTaken(String),

    /// Referenced tier is unknown or deactivated. Configuration error,
    /// not retryable.
    TierNotFound(TierId),

    /// Operation requires a subscription the member does not have.
    NoSubscription(MemberId),

    /// Reactivation requested but nothing is scheduled to cancel.
    NotScheduledForCancellation(MemberId),

    /// Invalid lifecycle state for the requested operation.
    InvalidState { current: String, attempted: String },

    /// Payment processor call failed; the member must know payment setup
    /// did not complete.
    PaymentFailed { reason: String },

    /// Webhook signature verification failed.
    InvalidWebhookSignature,

    /// Validation failed.
    ValidationFailed { field: String, message: String },

    /// Infrastructure error.
    Infrastructure(String),
}

impl MemberError {
    pub fn not_found(id: MemberId) -> Self {
        MemberError::NotFound(id)
    }

    pub fn email_taken(email: impl Into<String>) -> Self {
        MemberError::EmailTaken(email.into())
    }

    pub fn tier_not_found(tier_id: TierId) -> Self {
        MemberError::TierNotFound(tier_id)
    }

    pub fn no_subscription(id: MemberId) -> Self {
        MemberError::NoSubscription(id)
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        MemberError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn payment_failed(reason: impl Into<String>) -> Self {
        MemberError::PaymentFailed {
            reason: reason.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        MemberError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        MemberError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            MemberError::NotFound(_) => ErrorCode::MemberNotFound,
            MemberError::EmailTaken(_) => ErrorCode::MemberExists,
            MemberError::TierNotFound(_) => ErrorCode::TierNotFound,
            MemberError::NoSubscription(_) => ErrorCode::SubscriptionNotFound,
            MemberError::NotScheduledForCancellation(_) => ErrorCode::ValidationFailed,
            MemberError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            MemberError::PaymentFailed { .. } => ErrorCode::PaymentFailed,
            MemberError::InvalidWebhookSignature => ErrorCode::InvalidWebhookSignature,
            MemberError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            MemberError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-facing error message.
    pub fn message(&self) -> String {
        match self {
            MemberError::NotFound(id) => format!("Member not found: {}", id),
            MemberError::EmailTaken(email) => {
                format!("An account already exists for {}", email)
            }
            MemberError::TierNotFound(tier_id) => {
                format!("Membership tier {} is unknown or no longer offered", tier_id)
            }
            MemberError::NoSubscription(id) => {
                format!("Member {} has no subscription", id)
            }
            MemberError::NotScheduledForCancellation(id) => {
                format!("Member {} subscription is not scheduled for cancellation", id)
            }
            MemberError::InvalidState { current, attempted } => {
                format!("Cannot {} while membership is {}", attempted, current)
            }
            MemberError::PaymentFailed { reason } => format!("Payment setup failed: {}", reason),
            MemberError::InvalidWebhookSignature => "Invalid webhook signature".to_string(),
            MemberError::ValidationFailed { field, message } => {
                format!("Invalid {}: {}", field, message)
            }
            MemberError::Infrastructure(msg) => format!("Internal error: {}", msg),
        }
    }
}

impl std::fmt::Display for MemberError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for MemberError {}

impl From<DomainError> for MemberError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::InvalidStateTransition => MemberError::InvalidState {
                current: err
                    .details
                    .get("current")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                attempted: err
                    .details
                    .get("attempted")
                    .cloned()
                    .unwrap_or(err.message),
            },
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => MemberError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            _ => MemberError::Infrastructure(err.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_and_message() {
        let err = MemberError::not_found(MemberId::new(7));
        let s = err.to_string();
        assert!(s.contains("MEMBER_NOT_FOUND"));
        assert!(s.contains('7'));
    }

    #[test]
    fn tier_not_found_maps_to_tier_code() {
        assert_eq!(
            MemberError::tier_not_found(TierId::new(9)).code(),
            ErrorCode::TierNotFound
        );
    }

    #[test]
    fn state_transition_error_carries_current_and_attempted() {
        use crate::domain::member::Member;

        let mut member = Member::signup(MemberId::new(1), "pat@example.com", None).unwrap();
        let domain = member.cancel().unwrap_err();

        let err: MemberError = domain.into();
        match &err {
            MemberError::InvalidState { current, attempted } => {
                assert_eq!(current, "pending_tier_selection");
                assert_eq!(attempted, "enter canceled");
            }
            other => panic!("expected InvalidState, got {:?}", other),
        }
        assert_eq!(
            err.message(),
            "Cannot enter canceled while membership is pending_tier_selection"
        );
    }

    #[test]
    fn domain_validation_error_converts() {
        let domain = DomainError::validation("email", "must be unique");
        let err: MemberError = domain.into();
        assert!(matches!(err, MemberError::ValidationFailed { .. }));
    }

    #[test]
    fn domain_infrastructure_error_converts() {
        let domain = DomainError::new(ErrorCode::DatabaseError, "connection lost");
        let err: MemberError = domain.into();
        assert!(matches!(err, MemberError::Infrastructure(_)));
    }
}
