//! Member aggregate and membership lifecycle.

mod aggregate;
mod errors;
mod status;
mod subscription;

pub use aggregate::{Member, TierChangeAudit};
pub use errors::MemberError;
pub use status::{MemberStatus, PastDuePolicy};
pub use subscription::{PaymentStatus, Subscription};
