#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Dineflow Shared Types and Utilities
//!
//! This crate contains the subscription domain types, errors, and database
//! helpers shared by the billing crate and the API server.

pub mod db;
pub mod error;
pub mod types;

pub use db::*;
pub use error::*;
pub use types::*;
