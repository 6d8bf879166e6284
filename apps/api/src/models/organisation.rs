use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A recruitment-agency account. The subscription columns live here — one
/// row per tenant, created with the organisation and never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrganisationRow {
    pub id: Uuid,
    pub name: String,
    pub plan: Option<String>,
    pub subscription_status: Option<String>,
    pub subscription_current_period_end: Option<DateTime<Utc>>,
    pub subscription_cancel_at: Option<DateTime<Utc>>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub max_candidates: Option<i32>,
    pub max_team_members: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TeamMemberRow {
    pub id: Uuid,
    pub org_id: Uuid,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}
