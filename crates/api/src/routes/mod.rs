//! API routes

pub mod admin;
pub mod billing;
pub mod health;
pub mod webhook;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    auth::{require_auth, require_super_admin},
    state::AppState,
};

/// CORS for the dashboard routes, restricted to the configured origins
fn dashboard_cors(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    let auth_state = state.auth_state();

    // Health check routes (at root level for infrastructure monitoring)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    // Stripe webhook (public, uses signature verification, sets its own CORS headers)
    let webhook_routes = Router::new().route(
        "/billing/webhook",
        post(webhook::webhook).options(webhook::webhook_preflight),
    );

    // Public dashboard routes
    let public_routes = Router::new().route("/admin/login", post(admin::login));

    // Restaurant owner routes (Supabase JWT required)
    let billing_routes = Router::new()
        .route("/billing/subscription", get(billing::get_subscription))
        .route("/billing/cancel", post(billing::cancel_subscription))
        .layer(middleware::from_fn_with_state(auth_state.clone(), require_auth));

    // Super-admin routes (admin session required)
    let admin_routes = Router::new()
        .route("/admin/logout", post(admin::logout))
        .route("/admin/stats", get(admin::platform_stats))
        .route("/admin/restaurants", get(admin::list_restaurants))
        .route("/admin/subscriptions", get(admin::list_subscriptions))
        .route("/admin/support/tickets", get(admin::list_tickets))
        .layer(middleware::from_fn_with_state(auth_state, require_super_admin));

    let dashboard_routes = Router::new()
        .merge(public_routes)
        .merge(billing_routes)
        .merge(admin_routes)
        .layer(dashboard_cors(&state.config.allowed_origins));

    // Combine API routes under /api/v1 prefix
    let api_v1_routes = Router::new()
        .merge(dashboard_routes)
        .merge(webhook_routes);

    Router::new()
        .merge(health_routes)
        .nest("/api/v1", api_v1_routes)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
