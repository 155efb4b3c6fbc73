//! Membership tier catalog types.

mod tier;

pub use tier::{Tier, TierBenefits};
