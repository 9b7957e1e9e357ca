//! Error types for Dineflow

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DineflowError {
    #[error("Unknown plan type: {0}")]
    UnknownPlan(String),

    #[error("Unknown subscription status: {0}")]
    UnknownStatus(String),

    #[error("Invalid account id: {0}")]
    InvalidAccountId(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
