//! Billing access projection
//!
//! Read-only view of an account's subscription as the billing page consumes
//! it. `expired` is derived here from the period end and never written back.

use std::sync::Arc;

use dineflow_shared::{AccountId, PlanType, SubscriptionRecord, SubscriptionStatus};
use serde::Serialize;
use time::OffsetDateTime;

use crate::error::BillingResult;
use crate::plans::{display_name, PlanFeatures};
use crate::store::{SubscriptionFilter, SubscriptionStore};

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionAccess {
    pub subscription: Option<SubscriptionRecord>,
    /// Stored status with `expired` derived from the period end
    pub status: Option<SubscriptionStatus>,
    pub plan_name: &'static str,
    pub features: PlanFeatures,
    pub days_remaining: i64,
    pub has_access: bool,
}

/// Status as seen at `now`: active and past-due records past their period end
/// read as expired.
pub fn effective_status(record: &SubscriptionRecord, now: OffsetDateTime) -> SubscriptionStatus {
    match record.status {
        SubscriptionStatus::Active | SubscriptionStatus::PastDue
            if record.current_period_end < now =>
        {
            SubscriptionStatus::Expired
        }
        status => status,
    }
}

/// Whole days until `period_end`, rounded up, never negative
pub fn days_remaining(period_end: OffsetDateTime, now: OffsetDateTime) -> i64 {
    let secs = (period_end - now).whole_seconds();
    if secs <= 0 {
        0
    } else {
        (secs + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
    }
}

impl SubscriptionAccess {
    pub fn project(record: Option<SubscriptionRecord>, now: OffsetDateTime) -> Self {
        let Some(record) = record else {
            return Self {
                subscription: None,
                status: None,
                plan_name: display_name(PlanType::Trial),
                features: PlanFeatures::for_plan(PlanType::Trial),
                days_remaining: 0,
                has_access: false,
            };
        };

        let status = effective_status(&record, now);
        let has_access = matches!(status, SubscriptionStatus::Active | SubscriptionStatus::PastDue);
        let features = if has_access {
            PlanFeatures::for_plan(record.plan_type)
        } else {
            PlanFeatures::for_plan(PlanType::Trial)
        };

        Self {
            status: Some(status),
            plan_name: display_name(record.plan_type),
            features,
            days_remaining: days_remaining(record.current_period_end, now),
            has_access,
            subscription: Some(record),
        }
    }
}

/// Computes [`SubscriptionAccess`] for accounts
#[derive(Clone)]
pub struct AccessService {
    store: Arc<dyn SubscriptionStore>,
}

impl AccessService {
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Self {
        Self { store }
    }

    pub async fn check_access(
        &self,
        account_id: AccountId,
        now: OffsetDateTime,
    ) -> BillingResult<SubscriptionAccess> {
        let record = self.store.find(SubscriptionFilter::AccountId(account_id)).await?;
        Ok(SubscriptionAccess::project(record, now))
    }
}
