//! Authentication module for Dineflow

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod sessions;

pub use jwt::{AdminClaims, JwtError, JwtManager, SupabaseClaims, ADMIN_SESSION_TOKEN_TYPE};
pub use middleware::{require_auth, require_super_admin, AdminSession, AuthError, AuthState, AuthUser};
pub use password::{hash_password, verify_admin_credentials, verify_password, PasswordError};
pub use sessions::SessionRevocations;
