//! Application configuration

use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_address: String,
    pub allowed_origins: Vec<String>,

    // Database
    pub database_url: String,
    pub database_direct_url: Option<String>,
    pub database_max_connections: u32,
    pub run_migrations: bool,

    // Authentication
    pub jwt_secret: String,
    pub supabase_jwt_secret: String,
    pub super_admin_email: String,
    pub super_admin_password_hash: String,
    pub admin_session_hours: i64,

    // Feature flags
    pub enable_billing: bool,
}

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173,http://127.0.0.1:5173";

fn flag(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Server
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),

            // Database
            database_url: required("DATABASE_URL")?,
            database_direct_url: env::var("DATABASE_DIRECT_URL").ok(),
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .unwrap_or(20),
            run_migrations: flag("RUN_MIGRATIONS", true),

            // Authentication
            jwt_secret: {
                let secret = required("JWT_SECRET")?;
                if secret.len() < 32 {
                    return Err(ConfigError::WeakSecret(
                        "JWT_SECRET must be at least 32 characters",
                    ));
                }
                secret
            },
            supabase_jwt_secret: required("SUPABASE_JWT_SECRET")?,
            super_admin_email: required("SUPER_ADMIN_EMAIL")?.trim().to_lowercase(),
            super_admin_password_hash: {
                let hash = required("SUPER_ADMIN_PASSWORD_HASH")?;
                // Generate with: cargo run --bin hash-password
                if !hash.starts_with("$argon2") {
                    return Err(ConfigError::InvalidPasswordHash(
                        "SUPER_ADMIN_PASSWORD_HASH must be an Argon2 PHC string",
                    ));
                }
                hash
            },
            admin_session_hours: env::var("ADMIN_SESSION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .unwrap_or(24),

            // Feature flags
            enable_billing: flag("ENABLE_BILLING", true),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("Weak secret: {0}")]
    WeakSecret(&'static str),
    #[error("Invalid password hash: {0}")]
    InvalidPasswordHash(&'static str),
}
