//! Foundation value objects shared across the domain.
//!
//! Contains strongly-typed identifiers, timestamps, money, error types,
//! and the state machine trait used by lifecycle statuses.

mod errors;
mod ids;
mod money;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{BatchId, MemberId, MemberNumber, SubscriptionId, TierId, TransactionId};
pub use money::{BonusRate, Money};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
