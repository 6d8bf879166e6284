use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::billing::entitlements::EntitlementSnapshot;
use crate::billing::subscription::SubscriptionEvent;
use crate::errors::AppError;
use crate::state::AppState;

/// GET /api/v1/plans
pub async fn handle_list_plans(State(state): State<AppState>) -> Json<Value> {
    let mut plans: Vec<_> = state.catalog.iter().collect();
    plans.sort_by_key(|p| p.price_cents);
    Json(json!({ "plans": plans }))
}

/// GET /api/v1/orgs/:id/entitlements
pub async fn handle_get_entitlements(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
) -> Result<Json<EntitlementSnapshot>, AppError> {
    let snapshot = state
        .resolver
        .subscription_context(org_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Organisation {org_id} not found")))?;
    Ok(Json(snapshot))
}

/// GET /api/v1/orgs/:id/templates
pub async fn handle_allowed_templates(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let templates = state.resolver.allowed_templates(org_id).await?;
    Ok(Json(json!({ "cv_templates": templates })))
}

/// GET /api/v1/orgs/:id/features/:feature
///
/// Boolean feature gate, used by the browser extension and in-browser AI
/// tooling to decide what to surface.
pub async fn handle_check_feature(
    State(state): State<AppState>,
    Path((org_id, feature)): Path<(Uuid, String)>,
) -> Result<Json<Value>, AppError> {
    let enabled = state.resolver.has_feature(org_id, &feature).await?;
    Ok(Json(json!({ "feature": feature, "enabled": enabled })))
}

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub customer_id: String,
    #[serde(flatten)]
    pub event: SubscriptionEvent,
}

#[derive(Serialize)]
pub struct WebhookResponse {
    pub received: bool,
    pub applied: bool,
}

/// POST /api/v1/billing/webhook
///
/// Always 200: unknown customers and persistence failures are swallowed by
/// the mapper, so the provider never retries into a poison loop.
pub async fn handle_billing_webhook(
    State(state): State<AppState>,
    Json(payload): Json<WebhookPayload>,
) -> Json<WebhookResponse> {
    let applied = state
        .webhook
        .update_subscription(&payload.customer_id, &payload.event)
        .await;
    Json(WebhookResponse {
        received: true,
        applied,
    })
}
