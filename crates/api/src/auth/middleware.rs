//! Authentication middleware for Axum

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dineflow_shared::AccountId;
use serde_json::json;

use super::jwt::{JwtError, JwtManager};
use super::sessions::SessionRevocations;

/// Restaurant owner authenticated by a Supabase JWT
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub account_id: AccountId,
    pub email: Option<String>,
}

/// Validated super-admin session
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub email: String,
    pub jti: String,
    pub expires_at: i64,
}

/// State needed for authentication
#[derive(Clone)]
pub struct AuthState {
    pub jwt_manager: JwtManager,
    pub revocations: SessionRevocations,
}

/// Extract bearer token from the Authorization header
fn extract_bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Middleware that requires a restaurant owner's Supabase token
pub async fn require_auth(
    State(auth_state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    let Some(token) = extract_bearer_token(&request) else {
        tracing::warn!(path = %path, "require_auth: no bearer token");
        return AuthError::MissingAuth.into_response();
    };

    match authenticate_user(&auth_state, &token) {
        Ok(auth_user) => {
            tracing::debug!(
                path = %path,
                account_id = %auth_user.account_id,
                "require_auth: authentication successful"
            );
            request.extensions_mut().insert(auth_user);
            next.run(request).await
        }
        Err(err) => {
            tracing::warn!(path = %path, error = ?err, "require_auth: authentication failed");
            err.into_response()
        }
    }
}

fn authenticate_user(auth_state: &AuthState, token: &str) -> Result<AuthUser, AuthError> {
    let claims = auth_state
        .jwt_manager
        .validate_supabase_token(token)
        .map_err(AuthError::from)?;

    let account_id = AccountId::parse(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

    Ok(AuthUser {
        account_id,
        email: claims.email,
    })
}

/// Middleware that requires a valid, unrevoked super-admin session
pub async fn require_super_admin(
    State(auth_state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    let Some(token) = extract_bearer_token(&request) else {
        tracing::warn!(path = %path, "require_super_admin: no bearer token");
        return AuthError::MissingAuth.into_response();
    };

    let claims = match auth_state.jwt_manager.validate_admin_session(&token) {
        Ok(claims) => claims,
        Err(err) => {
            tracing::warn!(path = %path, error = %err, "require_super_admin: invalid session");
            return AuthError::from(err).into_response();
        }
    };

    if auth_state.revocations.is_revoked(&claims.jti).await {
        tracing::warn!(path = %path, jti = %claims.jti, "require_super_admin: session revoked");
        return AuthError::SessionRevoked.into_response();
    }

    request.extensions_mut().insert(AdminSession {
        email: claims.sub,
        jti: claims.jti,
        expires_at: claims.exp,
    });
    next.run(request).await
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Session has been revoked")]
    SessionRevoked,
    #[error("Insufficient permissions")]
    InsufficientPermissions,
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::WrongTokenType => AuthError::InsufficientPermissions,
            _ => AuthError::InvalidToken,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid or expired token"),
            AuthError::SessionRevoked => (StatusCode::UNAUTHORIZED, "Session has been revoked"),
            AuthError::InsufficientPermissions => {
                (StatusCode::FORBIDDEN, "Insufficient permissions")
            }
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}
