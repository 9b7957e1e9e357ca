//! Platform-wide statistics for the super-admin overview

use axum::{extract::State, Json};
use dineflow_billing::price_cents;
use dineflow_shared::{PlanType, SubscriptionStatus};
use serde::Serialize;
use uuid::Uuid;

use super::shared::db_failure;
use crate::{error::ApiResult, state::AppState};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformStats {
    pub total_restaurants: i64,
    pub total_customers: i64,
    pub total_subscriptions: i64,
    pub active_subscriptions: i64,
    pub trial_subscriptions: i64,
    pub paid_subscriptions: i64,
    /// Cancelled share of all subscriptions, in percent
    pub churn_rate: f64,
    /// One period's price summed over every subscription
    pub estimated_revenue_cents: i64,
}

/// Aggregate `(plan, stored status)` pairs into platform statistics
pub fn compute_platform_stats(
    subscriptions: &[(PlanType, SubscriptionStatus)],
    total_restaurants: i64,
    total_customers: i64,
) -> PlatformStats {
    let total = subscriptions.len() as i64;
    let with_status = |wanted: SubscriptionStatus| {
        subscriptions.iter().filter(|(_, status)| *status == wanted).count() as i64
    };

    let active = with_status(SubscriptionStatus::Active);
    let cancelled = with_status(SubscriptionStatus::Cancelled);
    let paid = subscriptions.iter().filter(|(plan, _)| plan.is_paid()).count() as i64;

    let churn_rate = if total > 0 {
        cancelled as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    PlatformStats {
        total_restaurants,
        total_customers,
        total_subscriptions: total,
        active_subscriptions: active,
        trial_subscriptions: total - paid,
        paid_subscriptions: paid,
        churn_rate,
        estimated_revenue_cents: subscriptions.iter().map(|(plan, _)| price_cents(*plan)).sum(),
    }
}

/// GET /admin/stats
pub async fn platform_stats(State(state): State<AppState>) -> ApiResult<Json<PlatformStats>> {
    let req_id = Uuid::new_v4();

    let (restaurants, customers, subscriptions) = tokio::try_join!(
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM restaurants").fetch_one(&state.pool),
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM customers").fetch_one(&state.pool),
        sqlx::query_as::<_, (PlanType, SubscriptionStatus)>(
            "SELECT plan_type, status FROM subscriptions"
        )
        .fetch_all(&state.pool),
    )
    .map_err(db_failure(req_id, "platform_stats"))?;

    let stats = compute_platform_stats(&subscriptions, restaurants, customers);
    tracing::debug!(%req_id, total_subscriptions = stats.total_subscriptions, "platform_stats");

    Ok(Json(stats))
}
