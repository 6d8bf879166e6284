pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::billing::handlers as billing;
use crate::orgs::handlers as orgs;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Plan catalog
        .route("/api/v1/plans", get(billing::handle_list_plans))
        // Organisations
        .route("/api/v1/orgs", post(orgs::handle_create_org))
        .route("/api/v1/orgs/:id", get(orgs::handle_get_org))
        .route(
            "/api/v1/orgs/:id/entitlements",
            get(billing::handle_get_entitlements),
        )
        .route(
            "/api/v1/orgs/:id/templates",
            get(billing::handle_allowed_templates),
        )
        .route(
            "/api/v1/orgs/:id/features/:feature",
            get(billing::handle_check_feature),
        )
        // Candidates & team members (cap-gated writes)
        .route(
            "/api/v1/orgs/:id/candidates",
            post(orgs::handle_create_candidate).get(orgs::handle_list_candidates),
        )
        .route(
            "/api/v1/orgs/:id/members",
            post(orgs::handle_create_member).get(orgs::handle_list_members),
        )
        // Billing webhook entrypoint
        .route("/api/v1/billing/webhook", post(billing::handle_billing_webhook))
        .with_state(state)
}
