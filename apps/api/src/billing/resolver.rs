//! Subscription Context Resolver.
//!
//! Joins a tenant's persisted subscription row with the Plan Catalog into an
//! `EntitlementSnapshot`, with a per-tenant TTL cache. The cache is owned by
//! the resolver and injected wherever it is needed — there is no process
//! global — and the webhook mapper invalidates the tenant's entry on every
//! successful write, so a plan change is visible on the next read.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::billing::entitlements::{self, EntitlementSnapshot};
use crate::billing::plans::PlanCatalog;
use crate::billing::store::SubscriptionStore;
use crate::errors::AppError;

/// Policy for computing `is_active`. Whether a stored `current_period_end`
/// should be compared against the clock is a product decision, so it is
/// configurable rather than hardcoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivePolicy {
    /// Active iff status ∈ {active, trialing}; timestamps carried passively.
    StatusOnly,
    /// Additionally require `current_period_end` (when set) to be in the future.
    HonorPeriodEnd,
}

impl ActivePolicy {
    pub fn from_str_or_default(value: Option<&str>) -> Self {
        match value {
            Some("honor_period_end") => ActivePolicy::HonorPeriodEnd,
            _ => ActivePolicy::StatusOnly,
        }
    }
}

struct CacheEntry {
    snapshot: EntitlementSnapshot,
    expires_at: Instant,
}

pub struct SubscriptionResolver {
    store: Arc<dyn SubscriptionStore>,
    catalog: Arc<PlanCatalog>,
    policy: ActivePolicy,
    ttl: Duration,
    cache: RwLock<HashMap<Uuid, CacheEntry>>,
}

impl SubscriptionResolver {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        catalog: Arc<PlanCatalog>,
        policy: ActivePolicy,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            catalog,
            policy,
            ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The tenant's entitlement snapshot, or `None` when no subscription row
    /// exists (callers must treat that as "no entitlements").
    pub async fn subscription_context(
        &self,
        org_id: Uuid,
    ) -> Result<Option<EntitlementSnapshot>, AppError> {
        if let Some(snapshot) = self.cached(org_id) {
            return Ok(Some(snapshot));
        }

        let Some(row) = self.store.subscription(org_id).await? else {
            // Missing tenants are not cached: a row created moments later
            // must be visible immediately.
            return Ok(None);
        };

        let snapshot =
            EntitlementSnapshot::from_row(&row, &self.catalog, self.policy, Utc::now());

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(
                org_id,
                CacheEntry {
                    snapshot: snapshot.clone(),
                    expires_at: Instant::now() + self.ttl,
                },
            );
        }

        Ok(Some(snapshot))
    }

    /// Drop the cached snapshot for a tenant. Called by the webhook mapper
    /// after every successful subscription write.
    pub fn invalidate(&self, org_id: Uuid) {
        if let Ok(mut cache) = self.cache.write() {
            if cache.remove(&org_id).is_some() {
                debug!(%org_id, "entitlement cache invalidated");
            }
        }
    }

    pub async fn has_feature(&self, org_id: Uuid, feature: &str) -> Result<bool, AppError> {
        let ctx = self.subscription_context(org_id).await?;
        Ok(entitlements::has_feature(ctx.as_ref(), feature))
    }

    pub async fn allowed_templates(&self, org_id: Uuid) -> Result<Vec<String>, AppError> {
        let ctx = self.subscription_context(org_id).await?;
        Ok(entitlements::allowed_templates(ctx.as_ref(), &self.catalog).to_vec())
    }

    fn cached(&self, org_id: Uuid) -> Option<EntitlementSnapshot> {
        let cache = self.cache.read().ok()?;
        let entry = cache.get(&org_id)?;
        if entry.expires_at > Instant::now() {
            Some(entry.snapshot.clone())
        } else {
            None
        }
    }

    #[cfg(test)]
    fn cache_len(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
