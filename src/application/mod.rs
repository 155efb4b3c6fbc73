//! Application layer: orchestrates domain objects through the ports.

pub mod handlers;
mod member_lock;

pub use member_lock::MemberLocks;
