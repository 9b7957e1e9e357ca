//! Dineflow API Library
//!
//! HTTP surface of the Dineflow backend: the Stripe webhook, the owner's
//! billing page and the super-admin dashboard.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
