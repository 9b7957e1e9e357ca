//! Plan catalog
//!
//! Single source of truth for billing period length, list price, display
//! name and feature entitlements of every plan. Every code path that computes
//! a period end goes through [`plan_duration`].

use dineflow_shared::PlanType;
use serde::{Deserialize, Serialize};
use time::Duration;

/// Period length used when a plan tag is not recognized
pub const DEFAULT_PERIOD_DAYS: i64 = 30;

/// Sentinel for "no limit" in [`PlanFeatures`] (what the dashboard expects)
pub const UNLIMITED: i64 = -1;

/// Billing period length for a raw plan tag.
///
/// `monthly` → 30 days, `semiannual` → 180 days, `annual` → 365 days,
/// anything else (including `trial`) → 30 days.
pub fn plan_duration(plan_tag: &str) -> Duration {
    let days = match plan_tag.trim().to_lowercase().as_str() {
        "monthly" => 30,
        "semiannual" => 180,
        "annual" => 365,
        _ => DEFAULT_PERIOD_DAYS,
    };
    Duration::days(days)
}

/// Resolve a plan tag from processor metadata.
///
/// Unknown or missing tags fall back to `monthly`, the same plan whose
/// duration [`plan_duration`] falls back to. The boolean is `false` when the
/// fallback was used.
pub fn resolve_plan(plan_tag: Option<&str>) -> (PlanType, bool) {
    match plan_tag.map(str::parse::<PlanType>) {
        Some(Ok(plan)) => (plan, true),
        _ => (PlanType::Monthly, false),
    }
}

/// List price in cents (one charge per billing period)
pub fn price_cents(plan: PlanType) -> i64 {
    match plan {
        PlanType::Trial => 0,
        PlanType::Monthly => 299,
        PlanType::Semiannual => 999,
        PlanType::Annual => 1999,
    }
}

/// Human-readable plan name shown on the billing page
pub fn display_name(plan: PlanType) -> &'static str {
    match plan {
        PlanType::Trial => "Free Trial",
        PlanType::Monthly => "Monthly Plan",
        PlanType::Semiannual => "6-Month Plan",
        PlanType::Annual => "Annual Plan",
    }
}

/// Feature entitlements of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanFeatures {
    pub max_customers: i64,
    pub max_branches: i64,
    pub advanced_analytics: bool,
    pub priority_support: bool,
    pub api_access: bool,
    pub custom_branding: bool,
}

impl PlanFeatures {
    pub fn for_plan(plan: PlanType) -> Self {
        match plan {
            PlanType::Trial => Self {
                max_customers: 100,
                max_branches: 1,
                advanced_analytics: false,
                priority_support: false,
                api_access: false,
                custom_branding: false,
            },
            PlanType::Monthly => Self {
                max_customers: UNLIMITED,
                max_branches: 1,
                advanced_analytics: true,
                priority_support: false,
                api_access: false,
                custom_branding: false,
            },
            PlanType::Semiannual => Self {
                max_customers: UNLIMITED,
                max_branches: 3,
                advanced_analytics: true,
                priority_support: true,
                api_access: false,
                custom_branding: false,
            },
            PlanType::Annual => Self {
                max_customers: UNLIMITED,
                max_branches: UNLIMITED,
                advanced_analytics: true,
                priority_support: true,
                api_access: true,
                custom_branding: true,
            },
        }
    }
}
