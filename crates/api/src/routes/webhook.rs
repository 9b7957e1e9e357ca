//! Stripe webhook endpoint
//!
//! Answers in plain text and carries its own CORS headers; it is mounted
//! outside the dashboard CORS layer.

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

const CORS_HEADERS: [(HeaderName, &str); 3] = [
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
    (
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        "Content-Type, Authorization, stripe-signature",
    ),
];

fn with_cors(response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    let headers = response.headers_mut();
    for (name, value) in CORS_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }
    response
}

fn rejected(status: StatusCode, message: String) -> Response {
    with_cors((status, message))
}

/// Handle a Stripe webhook delivery
pub async fn webhook(State(state): State<AppState>, headers: HeaderMap, body: String) -> Response {
    tracing::info!(body_len = body.len(), "Stripe webhook received");

    let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
        tracing::warn!("Stripe webhook missing signature header");
        return rejected(StatusCode::BAD_REQUEST, "No signature".to_string());
    };

    let Some(billing) = state.billing.as_ref() else {
        tracing::error!("Stripe webhook received but billing is not configured");
        return rejected(
            StatusCode::SERVICE_UNAVAILABLE,
            "Webhook error: billing not configured".to_string(),
        );
    };

    match billing.process_webhook(&body, signature).await {
        Ok((event, outcome)) => {
            tracing::info!(
                event_id = %event.id,
                event_type = %event.lifecycle.type_name(),
                outcome = ?outcome,
                "Stripe webhook processed"
            );
            with_cors(Json(json!({ "received": true })))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Stripe webhook rejected");
            rejected(StatusCode::BAD_REQUEST, format!("Webhook error: {}", e))
        }
    }
}

/// CORS preflight for the webhook endpoint
pub async fn webhook_preflight() -> Response {
    with_cors(StatusCode::OK)
}
