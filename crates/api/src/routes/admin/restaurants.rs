//! Restaurant listing for the super-admin dashboard

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

/// Owners without a subscription row show as an active trial
#[derive(Debug, Serialize, FromRow)]
pub struct AdminRestaurantRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub owner_id: Uuid,
    pub owner_email: String,
    pub customer_count: i64,
    pub subscription_plan: PlanType,
    pub subscription_status: SubscriptionStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_activity: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct AdminRestaurantListResponse {
    pub restaurants: Vec<AdminRestaurantRow>,
    pub total: usize,
}

/// GET /admin/restaurants?search=&status=
pub async fn list_restaurants(
    State(state): State<AppState>,
    Query(filter): Query<ListFilter>,
) -> ApiResult<Json<AdminRestaurantListResponse>> {
    let req_id = Uuid::new_v4();

    let restaurants: Vec<AdminRestaurantRow> = sqlx::query_as(
        r#"
        SELECT
            r.id,
            r.name,
            r.slug,
            r.owner_id,
            COALESCE(u.email, $3) as owner_email,
            COALESCE((SELECT COUNT(*) FROM customers c WHERE c.restaurant_id = r.id), 0) as customer_count,
            COALESCE(s.plan_type, 'trial') as subscription_plan,
            COALESCE(s.status, 'active') as subscription_status,
            r.created_at,
            r.created_at as last_activity
        FROM restaurants r
        LEFT JOIN auth.users u ON u.id = r.owner_id
        LEFT JOIN subscriptions s ON s.user_id = r.owner_id
        WHERE 1=1
            AND ($1::text IS NULL
                OR r.name ILIKE $1
                OR r.slug ILIKE $1
                OR u.email ILIKE $1)
            AND ($2::text IS NULL OR COALESCE(s.status, 'active') = $2)
        ORDER BY r.created_at DESC
        "#,
    )
    .bind(filter.search_pattern())
    .bind(filter.status())
    .bind(UNKNOWN)
    .fetch_all(&state.pool)
    .await
    .map_err(db_failure(req_id, "list_restaurants"))?;

    tracing::debug!(%req_id, count = restaurants.len(), "list_restaurants");

    Ok(Json(AdminRestaurantListResponse {
        total: restaurants.len(),
        restaurants,
    }))
}
