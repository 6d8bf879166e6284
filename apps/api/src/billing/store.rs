//! Subscription persistence behind an injected trait.
//!
//! The resolver and webhook mapper never touch the pool directly — they hold
//! an `Arc<dyn SubscriptionStore>`, so tests run against the in-memory
//! implementation without a database. Mirrors how `AppState` carries
//! `Arc<dyn FitScorer>` elsewhere in the codebase.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::billing::subscription::TenantSubscription;
use crate::errors::AppError;

/// Plan assignment carried by a billing update when the price id mapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanAssignment {
    pub plan_id: String,
    /// Plan-default caps, written alongside the plan id. `None` = unlimited.
    pub max_candidates: Option<i32>,
    pub max_team_members: Option<i32>,
}

/// The single-statement update the webhook mapper applies to a tenant row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingUpdate {
    pub status: String,
    pub subscription_id: String,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at: Option<DateTime<Utc>>,
    /// `Some` only when the event's price id mapped to a catalog plan.
    pub plan: Option<PlanAssignment>,
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// The tenant's subscription row by primary key, if the tenant exists.
    async fn subscription(&self, org_id: Uuid) -> Result<Option<TenantSubscription>, AppError>;

    /// The tenant's subscription row by external billing customer id.
    async fn find_by_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<TenantSubscription>, AppError>;

    /// Apply a billing update to the tenant row in one statement.
    async fn apply_billing_update(
        &self,
        org_id: Uuid,
        update: &BillingUpdate,
    ) -> Result<(), AppError>;
}

const SUBSCRIPTION_COLUMNS: &str = "id AS org_id, plan, subscription_status, \
     subscription_current_period_end, subscription_cancel_at, \
     stripe_customer_id, stripe_subscription_id, max_candidates, max_team_members";

/// Postgres-backed store over the organisations table.
pub struct PgSubscriptionStore {
    pool: PgPool,
}

impl PgSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    async fn subscription(&self, org_id: Uuid) -> Result<Option<TenantSubscription>, AppError> {
        let row = sqlx::query_as(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM organisations WHERE id = $1"
        ))
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_by_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<TenantSubscription>, AppError> {
        let row = sqlx::query_as(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM organisations WHERE stripe_customer_id = $1"
        ))
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn apply_billing_update(
        &self,
        org_id: Uuid,
        update: &BillingUpdate,
    ) -> Result<(), AppError> {
        match &update.plan {
            Some(assignment) => {
                sqlx::query(
                    r#"
                    UPDATE organisations
                    SET subscription_status = $2,
                        stripe_subscription_id = $3,
                        subscription_current_period_end = $4,
                        subscription_cancel_at = $5,
                        plan = $6,
                        max_candidates = $7,
                        max_team_members = $8
                    WHERE id = $1
                    "#,
                )
                .bind(org_id)
                .bind(&update.status)
                .bind(&update.subscription_id)
                .bind(update.current_period_end)
                .bind(update.cancel_at)
                .bind(&assignment.plan_id)
                .bind(assignment.max_candidates)
                .bind(assignment.max_team_members)
                .execute(&self.pool)
                .await?;
            }
            // Unknown price id: status/subscription-id/timestamps only,
            // plan and caps stay untouched.
            None => {
                sqlx::query(
                    r#"
                    UPDATE organisations
                    SET subscription_status = $2,
                        stripe_subscription_id = $3,
                        subscription_current_period_end = $4,
                        subscription_cancel_at = $5
                    WHERE id = $1
                    "#,
                )
                .bind(org_id)
                .bind(&update.status)
                .bind(&update.subscription_id)
                .bind(update.current_period_end)
                .bind(update.cancel_at)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub mod memory {
    //! In-memory store for tests — no database round-trips.

    use std::collections::HashMap;
    use std::sync::RwLock;

    use super::*;

    #[derive(Default)]
    pub struct InMemorySubscriptionStore {
        rows: RwLock<HashMap<Uuid, TenantSubscription>>,
    }

    impl InMemorySubscriptionStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, row: TenantSubscription) {
            self.rows.write().unwrap().insert(row.org_id, row);
        }

        pub fn get(&self, org_id: Uuid) -> Option<TenantSubscription> {
            self.rows.read().unwrap().get(&org_id).cloned()
        }
    }

    #[async_trait]
    impl SubscriptionStore for InMemorySubscriptionStore {
        async fn subscription(
            &self,
            org_id: Uuid,
        ) -> Result<Option<TenantSubscription>, AppError> {
            Ok(self.rows.read().unwrap().get(&org_id).cloned())
        }

        async fn find_by_customer(
            &self,
            customer_id: &str,
        ) -> Result<Option<TenantSubscription>, AppError> {
            Ok(self
                .rows
                .read()
                .unwrap()
                .values()
                .find(|r| r.stripe_customer_id.as_deref() == Some(customer_id))
                .cloned())
        }

        async fn apply_billing_update(
            &self,
            org_id: Uuid,
            update: &BillingUpdate,
        ) -> Result<(), AppError> {
            let mut rows = self.rows.write().unwrap();
            let row = rows
                .get_mut(&org_id)
                .ok_or_else(|| AppError::NotFound(format!("Organisation {org_id} not found")))?;
            row.subscription_status = Some(update.status.clone());
            row.stripe_subscription_id = Some(update.subscription_id.clone());
            row.subscription_current_period_end = update.current_period_end;
            row.subscription_cancel_at = update.cancel_at;
            if let Some(assignment) = &update.plan {
                row.plan = Some(assignment.plan_id.clone());
                row.max_candidates = assignment.max_candidates;
                row.max_team_members = assignment.max_team_members;
            }
            Ok(())
        }
    }
}
