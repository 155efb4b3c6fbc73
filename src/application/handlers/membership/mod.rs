//! Membership lifecycle command handlers.

mod cancel_subscription;
mod change_tier;
mod confirm_payment;
mod reactivate_subscription;
mod select_tier;
mod signup;

#[cfg(test)]
mod test_support;

pub use cancel_subscription::{CancelSubscriptionCommand, CancelSubscriptionHandler};
pub use change_tier::{ChangeTierCommand, ChangeTierHandler};
pub use confirm_payment::{ConfirmPaymentCommand, ConfirmPaymentHandler};
pub use reactivate_subscription::{
    ReactivateSubscriptionCommand, ReactivateSubscriptionHandler,
};
pub use select_tier::{SelectTierCommand, SelectTierHandler, SelectTierResult};
pub use signup::{SignupCommand, SignupHandler};
