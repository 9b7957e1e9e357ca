//! Super-admin session revocation
//!
//! Logged-out session JTIs are remembered until the token would have expired
//! on its own. Entries past expiry are pruned on every revocation.

use std::collections::HashMap;
use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct SessionRevocations {
    /// jti -> token expiry (unix seconds)
    revoked: Arc<RwLock<HashMap<String, i64>>>,
}

impl SessionRevocations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revoke a session until its expiry
    pub async fn revoke(&self, jti: &str, exp: i64) {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, expires| *expires > now);
        revoked.insert(jti.to_string(), exp);
    }

    pub async fn is_revoked(&self, jti: &str) -> bool {
        self.revoked.read().await.contains_key(jti)
    }

    pub async fn len(&self) -> usize {
        self.revoked.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_revoke_and_check() {
        let revocations = SessionRevocations::new();
        let exp = OffsetDateTime::now_utc().unix_timestamp() + 3600;

        assert!(!revocations.is_revoked("jti-1").await);
        revocations.revoke("jti-1", exp).await;
        assert!(revocations.is_revoked("jti-1").await);
        assert!(!revocations.is_revoked("jti-2").await);
    }

    #[tokio::test]
    async fn test_expired_entries_are_pruned() {
        let revocations = SessionRevocations::new();
        let now = OffsetDateTime::now_utc().unix_timestamp();

        revocations.revoke("old", now - 10).await;
        revocations.revoke("fresh", now + 3600).await;

        assert!(!revocations.is_revoked("old").await);
        assert!(revocations.is_revoked("fresh").await);
        assert_eq!(revocations.len().await, 1);
    }
}
