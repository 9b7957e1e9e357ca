//! JWT token generation and validation

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// `token_type` claim of super-admin session tokens
pub const ADMIN_SESSION_TOKEN_TYPE: &str = "admin_session";

/// JWT claims of a super-admin session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    /// Subject (admin email)
    pub sub: String,
    /// Issued at
    pub iat: i64,
    /// Expiration
    pub exp: i64,
    /// Token type, always [`ADMIN_SESSION_TOKEN_TYPE`] for valid sessions
    pub token_type: String,
    /// JWT ID (jti) for revocation on logout
    pub jti: String,
}

/// JWT claims structure for Supabase-issued tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseClaims {
    /// Subject (user ID as string, will be parsed to UUID)
    pub sub: String,
    pub email: Option<String>,
    /// Role (authenticated, anon, etc.)
    pub role: Option<String>,
    pub aud: Option<String>,
    pub iat: Option<i64>,
    pub exp: i64,
}

/// JWT manager for token operations
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    supabase_decoding_key: DecodingKey,
    admin_session_hours: i64,
}

impl JwtManager {
    pub fn new(secret: &str, supabase_secret: &str, admin_session_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            supabase_decoding_key: DecodingKey::from_secret(supabase_secret.as_bytes()),
            admin_session_hours,
        }
    }

    /// Issue a super-admin session token with a unique JTI
    pub fn issue_admin_session(&self, email: &str) -> Result<(String, AdminClaims), JwtError> {
        self.issue_admin_session_at(email, OffsetDateTime::now_utc())
    }

    fn issue_admin_session_at(
        &self,
        email: &str,
        now: OffsetDateTime,
    ) -> Result<(String, AdminClaims), JwtError> {
        let exp = now + Duration::hours(self.admin_session_hours);

        let claims = AdminClaims {
            sub: email.to_string(),
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
            token_type: ADMIN_SESSION_TOKEN_TYPE.to_string(),
            jti: Uuid::new_v4().to_string(),
        };

        // Explicit algorithm prevents algorithm confusion attacks
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::Encoding(e.to_string()))?;

        Ok((token, claims))
    }

    /// Validate a super-admin session token (signature, expiry and type)
    pub fn validate_admin_session(&self, token: &str) -> Result<AdminClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 60; // 60 second clock skew tolerance

        let claims = decode::<AdminClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(map_decode_error)?;

        if claims.token_type != ADMIN_SESSION_TOKEN_TYPE {
            return Err(JwtError::WrongTokenType);
        }
        Ok(claims)
    }

    /// Session lifetime in seconds
    pub fn admin_session_seconds(&self) -> i64 {
        self.admin_session_hours * 3600
    }

    /// Validate a Supabase-issued JWT token
    pub fn validate_supabase_token(&self, token: &str) -> Result<SupabaseClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 60;
        // Supabase uses "authenticated" as the audience
        validation.set_audience(&["authenticated"]);

        decode::<SupabaseClaims>(token, &self.supabase_decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                if matches!(e.kind(), jsonwebtoken::errors::ErrorKind::InvalidAudience) {
                    tracing::warn!("Supabase JWT audience validation failed - rejecting token");
                }
                map_decode_error(e)
            })
    }
}

fn map_decode_error(e: jsonwebtoken::errors::Error) -> JwtError {
    use jsonwebtoken::errors::ErrorKind;

    match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::Expired,
        ErrorKind::InvalidToken
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidSignature
        | ErrorKind::InvalidAudience => JwtError::Invalid,
        _ => JwtError::Validation(e.to_string()),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token")]
    Invalid,
    #[error("Wrong token type")]
    WrongTokenType,
    #[error("Token encoding failed: {0}")]
    Encoding(String),
    #[error("Token validation failed: {0}")]
    Validation(String),
}
