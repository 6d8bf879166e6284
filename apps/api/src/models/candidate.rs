use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateRow {
    pub id: Uuid,
    pub org_id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    /// Free-text CV summary; length is gated by the plan's word ceiling.
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
}
