//! Subscription storage
//!
//! The reconciler only ever needs two mutations: an upsert keyed on the
//! account and a field-scoped update addressed by account or by Stripe
//! subscription id. Reads are used by the billing projection.

use std::collections::HashMap;

use async_trait::async_trait;
use dineflow_shared::{AccountId, PlanType, SubscriptionRecord, SubscriptionStatus};
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::BillingResult;

/// Full record written by the creation paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionUpsert {
    pub account_id: AccountId,
    pub plan_type: PlanType,
    pub status: SubscriptionStatus,
    pub current_period_start: OffsetDateTime,
    pub current_period_end: OffsetDateTime,
    /// `None` keeps whatever is already stored
    pub stripe_subscription_id: Option<String>,
    /// `None` keeps whatever is already stored
    pub stripe_customer_id: Option<String>,
}

/// Which record(s) an update or lookup addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionFilter {
    AccountId(AccountId),
    StripeSubscriptionId(String),
}

impl std::fmt::Display for SubscriptionFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AccountId(id) => write!(f, "user_id={}", id),
            Self::StripeSubscriptionId(id) => write!(f, "stripe_subscription_id={}", id),
        }
    }
}

/// Field-scoped update; unset fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionUpdate {
    pub status: Option<SubscriptionStatus>,
    pub current_period_start: Option<OffsetDateTime>,
    pub current_period_end: Option<OffsetDateTime>,
}

impl SubscriptionUpdate {
    pub fn status(status: SubscriptionStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Insert or overwrite the account's record (conflict key: account id)
    async fn upsert(&self, record: SubscriptionUpsert) -> BillingResult<SubscriptionRecord>;

    /// Apply `update` to every record matching `filter`, returning rows affected
    async fn update_where(
        &self,
        filter: SubscriptionFilter,
        update: SubscriptionUpdate,
    ) -> BillingResult<u64>;

    async fn find(&self, filter: SubscriptionFilter) -> BillingResult<Option<SubscriptionRecord>>;
}

// =============================================================================
// Postgres
// =============================================================================

const SUBSCRIPTION_COLUMNS: &str = "id, user_id, plan_type, status, current_period_start, \
     current_period_end, stripe_subscription_id, stripe_customer_id, created_at, updated_at";

/// `subscriptions` table backed store
#[derive(Clone)]
pub struct PgSubscriptionStore {
    pool: PgPool,
}

impl PgSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    async fn upsert(&self, record: SubscriptionUpsert) -> BillingResult<SubscriptionRecord> {
        let query = format!(
            r#"
            INSERT INTO subscriptions (
                user_id, plan_type, status, current_period_start, current_period_end,
                stripe_subscription_id, stripe_customer_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id) DO UPDATE SET
                plan_type = EXCLUDED.plan_type,
                status = EXCLUDED.status,
                current_period_start = EXCLUDED.current_period_start,
                current_period_end = EXCLUDED.current_period_end,
                stripe_subscription_id = COALESCE(EXCLUDED.stripe_subscription_id, subscriptions.stripe_subscription_id),
                stripe_customer_id = COALESCE(EXCLUDED.stripe_customer_id, subscriptions.stripe_customer_id),
                updated_at = NOW()
            RETURNING {}
            "#,
            SUBSCRIPTION_COLUMNS
        );

        let row = sqlx::query_as::<_, SubscriptionRecord>(&query)
            .bind(record.account_id)
            .bind(record.plan_type.as_str())
            .bind(record.status.as_str())
            .bind(record.current_period_start)
            .bind(record.current_period_end)
            .bind(record.stripe_subscription_id)
            .bind(record.stripe_customer_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    async fn update_where(
        &self,
        filter: SubscriptionFilter,
        update: SubscriptionUpdate,
    ) -> BillingResult<u64> {
        let query = format!(
            r#"
            UPDATE subscriptions SET
                status = COALESCE($1, status),
                current_period_start = COALESCE($2, current_period_start),
                current_period_end = COALESCE($3, current_period_end),
                updated_at = NOW()
            WHERE {} = $4
            "#,
            filter_column(&filter)
        );

        let query = sqlx::query(&query)
            .bind(update.status.map(|s| s.as_str()))
            .bind(update.current_period_start)
            .bind(update.current_period_end);
        let query = match filter {
            SubscriptionFilter::AccountId(id) => query.bind(id.0),
            SubscriptionFilter::StripeSubscriptionId(id) => query.bind(id),
        };
        let result = query.execute(&self.pool).await?;

        Ok(result.rows_affected())
    }

    async fn find(&self, filter: SubscriptionFilter) -> BillingResult<Option<SubscriptionRecord>> {
        let query = format!(
            "SELECT {} FROM subscriptions WHERE {} = $1 ORDER BY updated_at DESC LIMIT 1",
            SUBSCRIPTION_COLUMNS,
            filter_column(&filter)
        );

        let query = sqlx::query_as::<_, SubscriptionRecord>(&query);
        let query = match filter {
            SubscriptionFilter::AccountId(id) => query.bind(id.0),
            SubscriptionFilter::StripeSubscriptionId(id) => query.bind(id),
        };
        let row = query.fetch_optional(&self.pool).await?;

        Ok(row)
    }
}

fn filter_column(filter: &SubscriptionFilter) -> &'static str {
    match filter {
        SubscriptionFilter::AccountId(_) => "user_id",
        SubscriptionFilter::StripeSubscriptionId(_) => "stripe_subscription_id",
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// Process-local store for tests and local development
#[derive(Default)]
pub struct InMemorySubscriptionStore {
    records: RwLock<HashMap<AccountId, SubscriptionRecord>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored record
    pub async fn all(&self) -> Vec<SubscriptionRecord> {
        self.records.read().await.values().cloned().collect()
    }

    pub async fn insert(&self, record: SubscriptionRecord) {
        self.records.write().await.insert(record.account_id, record);
    }
}

fn matches(record: &SubscriptionRecord, filter: &SubscriptionFilter) -> bool {
    match filter {
        SubscriptionFilter::AccountId(id) => record.account_id == *id,
        SubscriptionFilter::StripeSubscriptionId(id) => {
            record.stripe_subscription_id.as_deref() == Some(id.as_str())
        }
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn upsert(&self, record: SubscriptionUpsert) -> BillingResult<SubscriptionRecord> {
        let now = OffsetDateTime::now_utc();
        let mut records = self.records.write().await;

        let stored = match records.get_mut(&record.account_id) {
            Some(existing) => {
                existing.plan_type = record.plan_type;
                existing.status = record.status;
                existing.current_period_start = record.current_period_start;
                existing.current_period_end = record.current_period_end;
                if record.stripe_subscription_id.is_some() {
                    existing.stripe_subscription_id = record.stripe_subscription_id;
                }
                if record.stripe_customer_id.is_some() {
                    existing.stripe_customer_id = record.stripe_customer_id;
                }
                existing.updated_at = now;
                existing.clone()
            }
            None => {
                let created = SubscriptionRecord {
                    id: Uuid::new_v4(),
                    account_id: record.account_id,
                    plan_type: record.plan_type,
                    status: record.status,
                    current_period_start: record.current_period_start,
                    current_period_end: record.current_period_end,
                    stripe_subscription_id: record.stripe_subscription_id,
                    stripe_customer_id: record.stripe_customer_id,
                    created_at: now,
                    updated_at: now,
                };
                records.insert(created.account_id, created.clone());
                created
            }
        };

        Ok(stored)
    }

    async fn update_where(
        &self,
        filter: SubscriptionFilter,
        update: SubscriptionUpdate,
    ) -> BillingResult<u64> {
        let now = OffsetDateTime::now_utc();
        let mut records = self.records.write().await;
        let mut rows = 0;

        for record in records.values_mut().filter(|r| matches(r, &filter)) {
            if let Some(status) = update.status {
                record.status = status;
            }
            if let Some(start) = update.current_period_start {
                record.current_period_start = start;
            }
            if let Some(end) = update.current_period_end {
                record.current_period_end = end;
            }
            record.updated_at = now;
            rows += 1;
        }

        Ok(rows)
    }

    async fn find(&self, filter: SubscriptionFilter) -> BillingResult<Option<SubscriptionRecord>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| matches(r, &filter))
            .max_by_key(|r| r.updated_at)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn upsert(account: AccountId, sub: Option<&str>) -> SubscriptionUpsert {
        SubscriptionUpsert {
            account_id: account,
            plan_type: PlanType::Monthly,
            status: SubscriptionStatus::Active,
            current_period_start: datetime!(2025-01-01 0:00 UTC),
            current_period_end: datetime!(2025-01-31 0:00 UTC),
            stripe_subscription_id: sub.map(str::to_string),
            stripe_customer_id: Some("cus_1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_upsert_keeps_one_record_per_account() {
        let store = InMemorySubscriptionStore::new();
        let account = AccountId::new();

        let first = store.upsert(upsert(account, Some("sub_1"))).await.unwrap();
        let second = store.upsert(upsert(account, Some("sub_1"))).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_without_subscription_keeps_existing_link() {
        let store = InMemorySubscriptionStore::new();
        let account = AccountId::new();

        store.upsert(upsert(account, Some("sub_1"))).await.unwrap();
        let record = store.upsert(upsert(account, None)).await.unwrap();

        assert_eq!(record.stripe_subscription_id.as_deref(), Some("sub_1"));
    }

    #[tokio::test]
    async fn test_update_where_is_field_scoped() {
        let store = InMemorySubscriptionStore::new();
        let account = AccountId::new();
        let before = store.upsert(upsert(account, Some("sub_1"))).await.unwrap();

        let rows = store
            .update_where(
                SubscriptionFilter::StripeSubscriptionId("sub_1".into()),
                SubscriptionUpdate::status(SubscriptionStatus::PastDue),
            )
            .await
            .unwrap();
        assert_eq!(rows, 1);

        let after = store
            .find(SubscriptionFilter::AccountId(account))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.status, SubscriptionStatus::PastDue);
        assert_eq!(after.current_period_start, before.current_period_start);
        assert_eq!(after.current_period_end, before.current_period_end);
        assert_eq!(after.plan_type, before.plan_type);
    }

    #[tokio::test]
    async fn test_update_where_unknown_ref_touches_nothing() {
        let store = InMemorySubscriptionStore::new();
        store.upsert(upsert(AccountId::new(), Some("sub_1"))).await.unwrap();

        let rows = store
            .update_where(
                SubscriptionFilter::StripeSubscriptionId("sub_missing".into()),
                SubscriptionUpdate::status(SubscriptionStatus::Cancelled),
            )
            .await
            .unwrap();

        assert_eq!(rows, 0);
        assert_eq!(store.all().await[0].status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_pg_upsert_and_update() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = dineflow_shared::create_pool(&url, 2).await.unwrap();
        dineflow_shared::run_migrations(&pool).await.unwrap();
        let store = PgSubscriptionStore::new(pool);

        let account = AccountId::new();
        let sub = format!("sub_{}", Uuid::new_v4().simple());
        store.upsert(upsert(account, Some(&sub))).await.unwrap();
        let record = store.upsert(upsert(account, None)).await.unwrap();
        assert_eq!(record.stripe_subscription_id.as_deref(), Some(sub.as_str()));

        let rows = store
            .update_where(
                SubscriptionFilter::StripeSubscriptionId(sub.clone()),
                SubscriptionUpdate::status(SubscriptionStatus::Cancelled),
            )
            .await
            .unwrap();
        assert_eq!(rows, 1);

        let found = store
            .find(SubscriptionFilter::AccountId(account))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.status, SubscriptionStatus::Cancelled);
    }
}
