//! Stripe client configuration

use stripe::Client;

use crate::error::{BillingError, BillingResult};

/// Default tolerance for webhook timestamps (matches Stripe's own libraries)
pub const DEFAULT_WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// Configuration for Stripe billing
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Stripe secret API key
    pub secret_key: String,
    /// Stripe webhook signing secret (`whsec_...`)
    pub webhook_secret: String,
    /// Maximum age of a signed webhook, in seconds
    pub webhook_tolerance_secs: i64,
}

impl StripeConfig {
    /// Create config from environment variables
    pub fn from_env() -> BillingResult<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .map_err(|_| BillingError::Config("STRIPE_SECRET_KEY not set".to_string()))?;
        let webhook_secret = std::env::var("STRIPE_WEBHOOK_SECRET")
            .map_err(|_| BillingError::Config("STRIPE_WEBHOOK_SECRET not set".to_string()))?;

        if webhook_secret.trim().is_empty() {
            return Err(BillingError::Config(
                "STRIPE_WEBHOOK_SECRET is empty".to_string(),
            ));
        }

        let webhook_tolerance_secs = std::env::var("STRIPE_WEBHOOK_TOLERANCE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_WEBHOOK_TOLERANCE_SECS);

        Ok(Self {
            secret_key,
            webhook_secret,
            webhook_tolerance_secs,
        })
    }
}

/// Stripe billing client
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
}

impl StripeClient {
    /// Create a new Stripe client from config
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            client: Client::new(&config.secret_key),
        }
    }

    /// Get the inner Stripe client
    pub fn inner(&self) -> &Client {
        &self.client
    }
}
