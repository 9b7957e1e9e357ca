//! Billing routes for the restaurant owner's billing page

use axum::{
    extract::{Extension, State},
    Json,
};
use dineflow_billing::{SubscriptionAccess, SubscriptionFilter, SubscriptionUpdate};
use dineflow_shared::SubscriptionStatus;
use time::OffsetDateTime;

use crate::{auth::AuthUser, error::ApiError, state::AppState};

/// Get the caller's subscription as the billing page shows it
pub async fn get_subscription(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<SubscriptionAccess>, ApiError> {
    let billing = state.billing.as_ref().ok_or(ApiError::ServiceUnavailable)?;

    let access = billing
        .access
        .check_access(auth_user.account_id, OffsetDateTime::now_utc())
        .await?;

    tracing::debug!(
        account_id = %auth_user.account_id,
        status = ?access.status,
        days_remaining = access.days_remaining,
        "get_subscription: projected access"
    );

    Ok(Json(access))
}

/// Cancel the caller's recurring subscription.
///
/// Only the local record changes; the Stripe subscription is left as is.
pub async fn cancel_subscription(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<SubscriptionAccess>, ApiError> {
    let billing = state.billing.as_ref().ok_or(ApiError::ServiceUnavailable)?;
    let filter = SubscriptionFilter::AccountId(auth_user.account_id);

    let record = billing
        .store
        .find(filter.clone())
        .await?
        .ok_or(ApiError::NotFound)?;

    if !record.is_recurring() {
        return Err(ApiError::BadRequest(
            "Only recurring subscriptions can be cancelled".to_string(),
        ));
    }

    let rows = billing
        .store
        .update_where(filter, SubscriptionUpdate::status(SubscriptionStatus::Cancelled))
        .await?;

    tracing::info!(
        account_id = %auth_user.account_id,
        subscription_id = ?record.stripe_subscription_id,
        rows,
        "Subscription cancelled by owner"
    );

    let access = billing
        .access
        .check_access(auth_user.account_id, OffsetDateTime::now_utc())
        .await?;
    Ok(Json(access))
}
