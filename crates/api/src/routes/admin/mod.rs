//! Super-admin routes
//!
//! - `session`: login and logout for the single super-admin account
//! - `stats`: platform-wide subscription statistics
//! - `restaurants`: restaurants with owner, customer count and plan
//! - `subscriptions`: most recent subscriptions with owner and restaurant
//! - `support`: support ticket inbox
//! - `shared`: query filters and logging helpers

pub mod restaurants;
pub mod session;
pub mod shared;
pub mod stats;
pub mod subscriptions;
pub mod support;

pub use restaurants::list_restaurants;
pub use session::{login, logout};
pub use stats::platform_stats;
pub use subscriptions::list_subscriptions;
pub use support::list_tickets;
