//! Application state

use sqlx::PgPool;
use std::sync::Arc;

use dineflow_billing::BillingService;

use crate::{
    auth::{AuthState, JwtManager, SessionRevocations},
    config::Config,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub jwt_manager: JwtManager,
    /// Logged-out super-admin sessions
    pub revocations: SessionRevocations,
    /// Billing service (None when billing is disabled or Stripe is not configured)
    pub billing: Option<Arc<BillingService>>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let billing = if config.enable_billing {
            match BillingService::from_env(pool.clone()) {
                Ok(svc) => {
                    tracing::info!("Stripe billing service initialized");
                    Some(Arc::new(svc))
                }
                Err(e) => {
                    tracing::warn!("Stripe billing not configured: {}", e);
                    None
                }
            }
        } else {
            tracing::info!("Billing disabled via config (ENABLE_BILLING=false)");
            None
        };

        Self::with_billing(pool, config, billing)
    }

    /// Build state around an already constructed billing service
    pub fn with_billing(pool: PgPool, config: Config, billing: Option<Arc<BillingService>>) -> Self {
        let jwt_manager = JwtManager::new(
            &config.jwt_secret,
            &config.supabase_jwt_secret,
            config.admin_session_hours,
        );

        Self {
            pool,
            config,
            jwt_manager,
            revocations: SessionRevocations::new(),
            billing,
        }
    }

    pub fn auth_state(&self) -> AuthState {
        AuthState {
            jwt_manager: self.jwt_manager.clone(),
            revocations: self.revocations.clone(),
        }
    }
}
