//! Super-admin login and logout

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::{verify_admin_credentials, AdminSession},
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AdminLoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Seconds until the session expires
    pub expires_in: i64,
    /// Unix timestamp of expiry
    pub expires_at: i64,
    pub email: String,
}

/// Exchange the super-admin credentials for a session token
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<AdminLoginRequest>,
) -> ApiResult<Json<AdminLoginResponse>> {
    let valid = verify_admin_credentials(
        &req.email,
        &req.password,
        &state.config.super_admin_email,
        &state.config.super_admin_password_hash,
    )
    .map_err(|e| {
        tracing::error!(error = %e, "Super-admin password hash is unusable");
        ApiError::Internal
    })?;

    if !valid {
        tracing::warn!("Super-admin login rejected");
        return Err(ApiError::InvalidCredentials);
    }

    let (token, claims) = state
        .jwt_manager
        .issue_admin_session(&state.config.super_admin_email)
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to issue admin session");
            ApiError::Internal
        })?;

    tracing::info!(jti = %claims.jti, expires_at = claims.exp, "Super-admin session issued");

    Ok(Json(AdminLoginResponse {
        access_token: token,
        token_type: "Bearer",
        expires_in: state.jwt_manager.admin_session_seconds(),
        expires_at: claims.exp,
        email: claims.sub,
    }))
}

/// End the current admin session
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<AdminSession>,
) -> StatusCode {
    state.revocations.revoke(&session.jti, session.expires_at).await;
    tracing::info!(jti = %session.jti, "Super-admin session revoked");
    StatusCode::NO_CONTENT
}
