//! Dashboard read models.

mod summary;

pub use summary::{MemberDashboard, StoreCreditBalance};
