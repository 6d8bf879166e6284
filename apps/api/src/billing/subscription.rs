//! Persisted subscription state and inbound billing events.
//!
//! The subscription columns live on the organisations table — one row per
//! tenant, created with the organisation and never deleted, only
//! status-transitioned. Provider status strings are stored verbatim; no
//! transition validation happens on our side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Statuses that count as "active" for entitlement purposes.
pub const ACTIVE_STATUSES: [&str; 2] = ["active", "trialing"];

/// Returns true iff the stored status is in the active set. A missing status
/// (fresh organisation) is inactive.
pub fn status_is_active(status: Option<&str>) -> bool {
    status.map(|s| ACTIVE_STATUSES.contains(&s)).unwrap_or(false)
}

/// A tenant's subscription row, projected from the organisations table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TenantSubscription {
    pub org_id: Uuid,
    /// Internal plan id; NULL resolves to the Basic tier.
    pub plan: Option<String>,
    /// Provider status string, stored verbatim ("active", "past_due", ...).
    pub subscription_status: Option<String>,
    pub subscription_current_period_end: Option<DateTime<Utc>>,
    pub subscription_cancel_at: Option<DateTime<Utc>>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    /// Per-tenant cap override; supersedes the plan default when set.
    pub max_candidates: Option<i32>,
    pub max_team_members: Option<i32>,
}

/// An inbound billing event, keyed externally by a billing customer id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionEvent {
    pub status: String,
    pub subscription_id: String,
    pub price_id: Option<String>,
    /// Epoch seconds; absent or non-positive values are ignored.
    pub current_period_end: Option<i64>,
    pub cancel_at: Option<i64>,
}
