use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::billing::plans::BASIC_PLAN_ID;
use crate::errors::AppError;
use crate::models::candidate::CandidateRow;
use crate::models::organisation::{OrganisationRow, TeamMemberRow};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateOrgRequest {
    pub name: String,
}

/// POST /api/v1/orgs
///
/// Creates the organisation together with its subscription defaults:
/// Basic plan, inactive status. Billing events move it from there.
pub async fn handle_create_org(
    State(state): State<AppState>,
    Json(req): Json<CreateOrgRequest>,
) -> Result<(StatusCode, Json<OrganisationRow>), AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Organisation name is required".to_string()));
    }

    let org: OrganisationRow = sqlx::query_as(
        r#"
        INSERT INTO organisations (id, name, plan, subscription_status, created_at)
        VALUES ($1, $2, $3, 'inactive', NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(BASIC_PLAN_ID)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(org)))
}

/// GET /api/v1/orgs/:id
pub async fn handle_get_org(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
) -> Result<Json<OrganisationRow>, AppError> {
    let org: Option<OrganisationRow> =
        sqlx::query_as("SELECT * FROM organisations WHERE id = $1")
            .bind(org_id)
            .fetch_optional(&state.db)
            .await?;

    let org = org.ok_or_else(|| AppError::NotFound(format!("Organisation {org_id} not found")))?;
    Ok(Json(org))
}

#[derive(Debug, Deserialize)]
pub struct CreateCandidateRequest {
    pub full_name: String,
    pub email: Option<String>,
    pub summary: Option<String>,
}

/// POST /api/v1/orgs/:id/candidates
///
/// Gated by the effective candidate cap: count first, then let the
/// entitlement snapshot decide whether one more fits.
pub async fn handle_create_candidate(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
    Json(req): Json<CreateCandidateRequest>,
) -> Result<(StatusCode, Json<CandidateRow>), AppError> {
    if req.full_name.trim().is_empty() {
        return Err(AppError::Validation("Candidate name is required".to_string()));
    }

    let ctx = state
        .resolver
        .subscription_context(org_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Organisation {org_id} not found")))?;

    let (current,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM candidates WHERE org_id = $1")
            .bind(org_id)
            .fetch_one(&state.db)
            .await?;

    if !ctx.can_add_candidate(current as u64) {
        return Err(AppError::PlanLimit(format!(
            "Candidate limit reached for plan {}",
            ctx.plan_id
        )));
    }

    if let Some(summary) = &req.summary {
        if ctx.word_limit_exceeded(summary) {
            return Err(AppError::PlanLimit(format!(
                "Summary exceeds the word limit for plan {}",
                ctx.plan_id
            )));
        }
    }

    let candidate: CandidateRow = sqlx::query_as(
        r#"
        INSERT INTO candidates (id, org_id, full_name, email, summary, created_at)
        VALUES ($1, $2, $3, $4, $5, NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(org_id)
    .bind(req.full_name.trim())
    .bind(&req.email)
    .bind(&req.summary)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(candidate)))
}

/// GET /api/v1/orgs/:id/candidates
pub async fn handle_list_candidates(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
) -> Result<Json<Vec<CandidateRow>>, AppError> {
    let candidates: Vec<CandidateRow> =
        sqlx::query_as("SELECT * FROM candidates WHERE org_id = $1 ORDER BY created_at")
            .bind(org_id)
            .fetch_all(&state.db)
            .await?;
    Ok(Json(candidates))
}

#[derive(Debug, Deserialize)]
pub struct CreateMemberRequest {
    pub email: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "recruiter".to_string()
}

/// POST /api/v1/orgs/:id/members
pub async fn handle_create_member(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
    Json(req): Json<CreateMemberRequest>,
) -> Result<(StatusCode, Json<TeamMemberRow>), AppError> {
    if req.email.trim().is_empty() {
        return Err(AppError::Validation("Member email is required".to_string()));
    }

    let ctx = state
        .resolver
        .subscription_context(org_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Organisation {org_id} not found")))?;

    let (current,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM team_members WHERE org_id = $1")
            .bind(org_id)
            .fetch_one(&state.db)
            .await?;

    if !ctx.can_add_team_member(current as u64) {
        return Err(AppError::PlanLimit(format!(
            "Team member limit reached for plan {}",
            ctx.plan_id
        )));
    }

    let member: TeamMemberRow = sqlx::query_as(
        r#"
        INSERT INTO team_members (id, org_id, email, role, created_at)
        VALUES ($1, $2, $3, $4, NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(org_id)
    .bind(req.email.trim())
    .bind(&req.role)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(member)))
}

/// GET /api/v1/orgs/:id/members
pub async fn handle_list_members(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
) -> Result<Json<Vec<TeamMemberRow>>, AppError> {
    let members: Vec<TeamMemberRow> =
        sqlx::query_as("SELECT * FROM team_members WHERE org_id = $1 ORDER BY created_at")
            .bind(org_id)
            .fetch_all(&state.db)
            .await?;
    Ok(Json(members))
}
