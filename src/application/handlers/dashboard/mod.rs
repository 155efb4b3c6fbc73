//! Dashboard read handlers.

mod get_dashboard;

pub use get_dashboard::GetDashboardHandler;
