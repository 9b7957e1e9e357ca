//! Subscription listing for the super-admin dashboard

use axum::{
    extract::{Query, State},
    Json,
};
use dineflow_shared::{PlanType, SubscriptionStatus};
use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::shared::{db_failure, ListFilter, UNKNOWN};
use crate::{error::ApiResult, state::AppState};

const RECENT_SUBSCRIPTIONS_LIMIT: i64 = 50;

#[derive(Debug, Serialize, FromRow)]
pub struct AdminSubscriptionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    pub restaurant_name: String,
    pub plan_type: PlanType,
    pub status: SubscriptionStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub current_period_start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub current_period_end: OffsetDateTime,
    pub stripe_subscription_id: Option<String>,
    pub stripe_customer_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct AdminSubscriptionListResponse {
    pub subscriptions: Vec<AdminSubscriptionRow>,
    pub total: usize,
}

/// GET /admin/subscriptions?search=&status=
pub async fn list_subscriptions(
    State(state): State<AppState>,
    Query(filter): Query<ListFilter>,
) -> ApiResult<Json<AdminSubscriptionListResponse>> {
    let req_id = Uuid::new_v4();

    // An owner with several restaurants is listed once, under the oldest.
    let subscriptions: Vec<AdminSubscriptionRow> = sqlx::query_as(
        r#"
        SELECT
            s.id,
            s.user_id,
            COALESCE(u.email, $4) as user_email,
            COALESCE(
                (SELECT r.name FROM restaurants r
                 WHERE r.owner_id = s.user_id
                 ORDER BY r.created_at ASC
                 LIMIT 1),
                $4
            ) as restaurant_name,
            s.plan_type,
            s.status,
            s.current_period_start,
            s.current_period_end,
            s.stripe_subscription_id,
            s.stripe_customer_id,
            s.created_at
        FROM subscriptions s
        LEFT JOIN auth.users u ON u.id = s.user_id
        WHERE 1=1
            AND ($1::text IS NULL
                OR u.email ILIKE $1
                OR s.stripe_subscription_id ILIKE $1
                OR EXISTS (
                    SELECT 1 FROM restaurants r
                    WHERE r.owner_id = s.user_id AND r.name ILIKE $1
                ))
            AND ($2::text IS NULL OR s.status = $2)
        ORDER BY s.created_at DESC
        LIMIT $3
        "#,
    )
    .bind(filter.search_pattern())
    .bind(filter.status())
    .bind(RECENT_SUBSCRIPTIONS_LIMIT)
    .bind(UNKNOWN)
    .fetch_all(&state.pool)
    .await
    .map_err(db_failure(req_id, "list_subscriptions"))?;

    tracing::debug!(%req_id, count = subscriptions.len(), "list_subscriptions");

    Ok(Json(AdminSubscriptionListResponse {
        total: subscriptions.len(),
        subscriptions,
    }))
}
