//! Stripe adapter implementing the payment provider port.

mod stripe_adapter;
mod webhook_types;

pub use stripe_adapter::{StripeConfig, StripePaymentAdapter};
