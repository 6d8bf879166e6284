//! Entitlement snapshots and the feature/limit gate.
//!
//! An `EntitlementSnapshot` is the merged, read-only view of a tenant's
//! subscription row and its plan definition. It is a pure function of the
//! row, the catalog, the active-policy and the clock — no I/O here.
//!
//! Gate semantics, fixed deliberately (the two inputs used to be conflated):
//! - no tenant row → no snapshot → every check denies;
//! - a tenant row with a null/unknown plan → full Basic entitlements.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::billing::plans::{features, Cap, FeatureValue, PlanCatalog};
use crate::billing::resolver::ActivePolicy;
use crate::billing::subscription::{status_is_active, TenantSubscription};

/// The resolved, merged view of a tenant's plan and overrides used for
/// gating decisions.
#[derive(Debug, Clone, Serialize)]
pub struct EntitlementSnapshot {
    pub org_id: Uuid,
    pub plan_id: String,
    pub status: Option<String>,
    pub is_active: bool,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at: Option<DateTime<Utc>>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    /// Effective caps: tenant override when present, plan default otherwise.
    pub max_candidates: Cap,
    pub max_team_members: Cap,
    pub max_cv_words: Cap,
    pub features: HashMap<&'static str, FeatureValue>,
}

impl EntitlementSnapshot {
    /// Merge a subscription row with its plan definition.
    pub fn from_row(
        row: &TenantSubscription,
        catalog: &PlanCatalog,
        policy: ActivePolicy,
        now: DateTime<Utc>,
    ) -> Self {
        let plan = catalog.get_or_basic(row.plan.as_deref());

        let mut is_active = status_is_active(row.subscription_status.as_deref());
        if is_active && policy == ActivePolicy::HonorPeriodEnd {
            if let Some(period_end) = row.subscription_current_period_end {
                is_active = period_end > now;
            }
        }

        EntitlementSnapshot {
            org_id: row.org_id,
            plan_id: plan.id.to_string(),
            status: row.subscription_status.clone(),
            is_active,
            current_period_end: row.subscription_current_period_end,
            cancel_at: row.subscription_cancel_at,
            stripe_customer_id: row.stripe_customer_id.clone(),
            stripe_subscription_id: row.stripe_subscription_id.clone(),
            max_candidates: effective_cap(row.max_candidates, plan.max_candidates),
            max_team_members: effective_cap(row.max_team_members, plan.max_team_members),
            max_cv_words: plan.max_cv_words,
            features: plan.features.clone(),
        }
    }

    /// Boolean feature check: absent entries, false flags and list-valued
    /// entries all read as `false`.
    pub fn has_feature(&self, name: &str) -> bool {
        self.features.get(name).map(FeatureValue::as_flag).unwrap_or(false)
    }

    /// Whether one more candidate profile may be created. Requires an active
    /// subscription and headroom under the effective cap.
    pub fn can_add_candidate(&self, current: u64) -> bool {
        self.is_active && self.max_candidates.allows(current)
    }

    /// Whether one more team member may be invited.
    pub fn can_add_team_member(&self, current: u64) -> bool {
        self.is_active && self.max_team_members.allows(current)
    }

    /// Whether a CV body exceeds the plan's word ceiling.
    pub fn word_limit_exceeded(&self, text: &str) -> bool {
        match self.max_cv_words {
            Cap::Unlimited => false,
            Cap::Limited(max) => text.split_whitespace().count() > max as usize,
        }
    }
}

fn effective_cap(override_value: Option<i32>, plan_default: Cap) -> Cap {
    match override_value {
        Some(n) if n >= 0 => Cap::Limited(n as u32),
        _ => plan_default,
    }
}

/// Boolean feature gate over an optional snapshot. `None` denies everything.
pub fn has_feature(ctx: Option<&EntitlementSnapshot>, name: &str) -> bool {
    ctx.map(|snapshot| snapshot.has_feature(name)).unwrap_or(false)
}

/// The CV templates a tenant may render. With no snapshot (or a plan without
/// a template list) the fallback is the Basic plan's own list, so the
/// default lives in exactly one place — the catalog.
pub fn allowed_templates<'a>(
    ctx: Option<&'a EntitlementSnapshot>,
    catalog: &'a PlanCatalog,
) -> &'a [String] {
    ctx.and_then(|snapshot| {
        snapshot
            .features
            .get(features::CV_TEMPLATES)
            .and_then(FeatureValue::as_list)
    })
    .unwrap_or_else(|| catalog.basic().cv_templates())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::plans::{BASIC_PLAN_ID, ENTERPRISE_PLAN_ID, PRO_PLAN_ID};
    use chrono::Duration;

    fn row(plan: Option<&str>, status: Option<&str>) -> TenantSubscription {
        TenantSubscription {
            org_id: Uuid::new_v4(),
            plan: plan.map(String::from),
            subscription_status: status.map(String::from),
            subscription_current_period_end: None,
            subscription_cancel_at: None,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            max_candidates: None,
            max_team_members: None,
        }
    }

    fn snapshot(row: &TenantSubscription) -> EntitlementSnapshot {
        EntitlementSnapshot::from_row(
            row,
            &PlanCatalog::new(),
            ActivePolicy::StatusOnly,
            Utc::now(),
        )
    }

    #[test]
    fn test_null_plan_resolves_to_basic() {
        let snap = snapshot(&row(None, Some("active")));
        assert_eq!(snap.plan_id, BASIC_PLAN_ID);
        assert_eq!(snap.max_candidates, Cap::Limited(10));
    }

    #[test]
    fn test_unknown_plan_resolves_to_basic() {
        let snap = snapshot(&row(Some("agency_platinum"), Some("active")));
        assert_eq!(snap.plan_id, BASIC_PLAN_ID);
    }

    #[test]
    fn test_is_active_membership() {
        assert!(snapshot(&row(None, Some("active"))).is_active);
        assert!(snapshot(&row(None, Some("trialing"))).is_active);
        assert!(!snapshot(&row(None, Some("past_due"))).is_active);
        assert!(!snapshot(&row(None, Some("canceled"))).is_active);
        assert!(!snapshot(&row(None, None)).is_active);
    }

    #[test]
    fn test_honor_period_end_policy() {
        let catalog = PlanCatalog::new();
        let now = Utc::now();

        let mut r = row(None, Some("active"));
        r.subscription_current_period_end = Some(now - Duration::days(1));
        let snap =
            EntitlementSnapshot::from_row(&r, &catalog, ActivePolicy::HonorPeriodEnd, now);
        assert!(!snap.is_active, "expired period should deactivate");

        // StatusOnly ignores the timestamp entirely.
        let snap = EntitlementSnapshot::from_row(&r, &catalog, ActivePolicy::StatusOnly, now);
        assert!(snap.is_active);

        // A future period end stays active under either policy.
        r.subscription_current_period_end = Some(now + Duration::days(7));
        let snap =
            EntitlementSnapshot::from_row(&r, &catalog, ActivePolicy::HonorPeriodEnd, now);
        assert!(snap.is_active);
    }

    #[test]
    fn test_override_caps_take_precedence() {
        let mut r = row(Some(BASIC_PLAN_ID), Some("active"));
        r.max_candidates = Some(25);
        let snap = snapshot(&r);
        assert_eq!(snap.max_candidates, Cap::Limited(25));
        // No override on team members: plan default applies.
        assert_eq!(snap.max_team_members, Cap::Limited(3));
    }

    #[test]
    fn test_api_access_only_on_enterprise() {
        assert!(!snapshot(&row(Some(BASIC_PLAN_ID), Some("active"))).has_feature(features::API_ACCESS));
        assert!(!snapshot(&row(Some(PRO_PLAN_ID), Some("active"))).has_feature(features::API_ACCESS));
        assert!(snapshot(&row(Some(ENTERPRISE_PLAN_ID), Some("active"))).has_feature(features::API_ACCESS));
    }

    #[test]
    fn test_gate_on_empty_context() {
        let catalog = PlanCatalog::new();
        assert!(!has_feature(None, features::API_ACCESS));
        assert_eq!(allowed_templates(None, &catalog), &["minimal", "classic"]);
    }

    #[test]
    fn test_allowed_templates_follow_plan() {
        let catalog = PlanCatalog::new();
        let snap = snapshot(&row(Some(PRO_PLAN_ID), Some("active")));
        let templates = allowed_templates(Some(&snap), &catalog);
        assert!(templates.iter().any(|t| t == "modern"));
    }

    #[test]
    fn test_can_add_candidate_requires_active_and_headroom() {
        let active = snapshot(&row(Some(BASIC_PLAN_ID), Some("active")));
        assert!(active.can_add_candidate(9));
        assert!(!active.can_add_candidate(10));

        let inactive = snapshot(&row(Some(BASIC_PLAN_ID), Some("inactive")));
        assert!(!inactive.can_add_candidate(0));
    }

    #[test]
    fn test_enterprise_caps_are_unlimited() {
        let snap = snapshot(&row(Some(ENTERPRISE_PLAN_ID), Some("active")));
        assert!(snap.can_add_candidate(1_000_000));
        assert!(snap.can_add_team_member(1_000_000));
        assert!(!snap.word_limit_exceeded(&"word ".repeat(5000)));
    }

    #[test]
    fn test_word_limit() {
        let snap = snapshot(&row(Some(BASIC_PLAN_ID), Some("active")));
        assert!(!snap.word_limit_exceeded(&"word ".repeat(600)));
        assert!(snap.word_limit_exceeded(&"word ".repeat(601)));
    }
}
