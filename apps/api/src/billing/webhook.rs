//! Webhook Plan Mapper.
//!
//! Translates an inbound billing event into a single update on the tenant's
//! subscription row. This is the only component with explicit failure
//! containment: lookup misses and persistence failures both collapse to
//! `false`, never an error to the caller — entitlements are a best-effort,
//! fail-open-to-defaults gate, not a transactional system.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::billing::plans::{
    PlanCatalog, BASIC_PLAN_ID, ENTERPRISE_PLAN_ID, PRO_PLAN_ID,
};
use crate::billing::resolver::SubscriptionResolver;
use crate::billing::store::{BillingUpdate, PlanAssignment, SubscriptionStore};
use crate::billing::subscription::SubscriptionEvent;
use crate::config::Config;
use crate::errors::AppError;

/// Environment-configured mapping from provider price ids to plan ids.
/// A tier whose price id is unconfigured simply never maps — not an error.
#[derive(Debug, Clone, Default)]
pub struct PriceMap {
    basic: Option<String>,
    pro: Option<String>,
    enterprise: Option<String>,
}

impl PriceMap {
    pub fn from_config(config: &Config) -> Self {
        Self {
            basic: config.stripe_price_basic.clone(),
            pro: config.stripe_price_pro.clone(),
            enterprise: config.stripe_price_enterprise.clone(),
        }
    }

    pub fn plan_for(&self, price_id: &str) -> Option<&'static str> {
        if self.basic.as_deref() == Some(price_id) {
            Some(BASIC_PLAN_ID)
        } else if self.pro.as_deref() == Some(price_id) {
            Some(PRO_PLAN_ID)
        } else if self.enterprise.as_deref() == Some(price_id) {
            Some(ENTERPRISE_PLAN_ID)
        } else {
            None
        }
    }

    #[cfg(test)]
    pub fn for_tests(basic: &str, pro: &str, enterprise: &str) -> Self {
        Self {
            basic: Some(basic.to_string()),
            pro: Some(pro.to_string()),
            enterprise: Some(enterprise.to_string()),
        }
    }
}

pub struct WebhookProcessor {
    store: Arc<dyn SubscriptionStore>,
    catalog: Arc<PlanCatalog>,
    resolver: Arc<SubscriptionResolver>,
    prices: PriceMap,
}

impl WebhookProcessor {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        catalog: Arc<PlanCatalog>,
        resolver: Arc<SubscriptionResolver>,
        prices: PriceMap,
    ) -> Self {
        Self {
            store,
            catalog,
            resolver,
            prices,
        }
    }

    /// Apply a billing event to the tenant identified by the provider's
    /// customer id. Returns `true` iff a row was updated. Unknown customers
    /// are ignored idempotently; persistence failures are logged and
    /// swallowed here, at the only boundary that catches them.
    pub async fn update_subscription(
        &self,
        customer_id: &str,
        event: &SubscriptionEvent,
    ) -> bool {
        match self.apply(customer_id, event).await {
            Ok(applied) => applied,
            Err(e) => {
                error!(customer_id, error = %e, "failed to apply subscription event");
                false
            }
        }
    }

    async fn apply(
        &self,
        customer_id: &str,
        event: &SubscriptionEvent,
    ) -> Result<bool, AppError> {
        let Some(row) = self.store.find_by_customer(customer_id).await? else {
            debug!(customer_id, "webhook for unknown billing customer, ignoring");
            return Ok(false);
        };

        // Unknown price ids leave plan and caps untouched; only the mapped
        // tiers carry a plan assignment (with the catalog's caps) along.
        let plan = event
            .price_id
            .as_deref()
            .and_then(|price_id| self.prices.plan_for(price_id))
            .and_then(|plan_id| self.catalog.get(plan_id))
            .map(|plan| PlanAssignment {
                plan_id: plan.id.to_string(),
                max_candidates: plan.max_candidates.value().map(|n| n as i32),
                max_team_members: plan.max_team_members.value().map(|n| n as i32),
            });

        let update = BillingUpdate {
            status: event.status.clone(),
            subscription_id: event.subscription_id.clone(),
            current_period_end: epoch_to_datetime(event.current_period_end),
            cancel_at: epoch_to_datetime(event.cancel_at),
            plan,
        };

        self.store.apply_billing_update(row.org_id, &update).await?;
        self.resolver.invalidate(row.org_id);

        info!(
            org_id = %row.org_id,
            status = %update.status,
            plan = update.plan.as_ref().map(|p| p.plan_id.as_str()).unwrap_or("<unchanged>"),
            "subscription updated from billing event"
        );
        Ok(true)
    }
}

/// Provider epoch seconds → storage timestamp; absent or non-positive
/// values are dropped.
fn epoch_to_datetime(epoch: Option<i64>) -> Option<DateTime<Utc>> {
    epoch
        .filter(|secs| *secs > 0)
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::resolver::ActivePolicy;
    use crate::billing::store::memory::InMemorySubscriptionStore;
    use crate::billing::subscription::TenantSubscription;
    use std::time::Duration;
    use uuid::Uuid;

    fn processor(
        rows: Vec<TenantSubscription>,
    ) -> (Arc<InMemorySubscriptionStore>, Arc<SubscriptionResolver>, WebhookProcessor) {
        let store = Arc::new(InMemorySubscriptionStore::new());
        for row in rows {
            store.insert(row);
        }
        let catalog = Arc::new(PlanCatalog::new());
        let resolver = Arc::new(SubscriptionResolver::new(
            store.clone(),
            catalog.clone(),
            ActivePolicy::StatusOnly,
            Duration::from_secs(60),
        ));
        let webhook = WebhookProcessor::new(
            store.clone(),
            catalog,
            resolver.clone(),
            PriceMap::for_tests("price_basic_123", "price_pro_456", "price_ent_789"),
        );
        (store, resolver, webhook)
    }

    fn tenant(org_id: Uuid, customer_id: &str) -> TenantSubscription {
        TenantSubscription {
            org_id,
            plan: Some(BASIC_PLAN_ID.to_string()),
            subscription_status: Some("inactive".to_string()),
            subscription_current_period_end: None,
            subscription_cancel_at: None,
            stripe_customer_id: Some(customer_id.to_string()),
            stripe_subscription_id: None,
            max_candidates: Some(10),
            max_team_members: Some(3),
        }
    }

    fn event(status: &str, price_id: Option<&str>) -> SubscriptionEvent {
        SubscriptionEvent {
            status: status.to_string(),
            subscription_id: "sub_abc".to_string(),
            price_id: price_id.map(String::from),
            current_period_end: Some(1_902_000_000),
            cancel_at: None,
        }
    }

    #[tokio::test]
    async fn test_unknown_customer_is_ignored() {
        let org_id = Uuid::new_v4();
        let (store, _, webhook) = processor(vec![tenant(org_id, "cus_known")]);

        let applied = webhook
            .update_subscription("cus_missing", &event("active", None))
            .await;
        assert!(!applied);

        // No writes happened.
        let row = store.get(org_id).unwrap();
        assert_eq!(row.subscription_status.as_deref(), Some("inactive"));
        assert!(row.stripe_subscription_id.is_none());
    }

    #[tokio::test]
    async fn test_mapped_price_applies_plan_and_caps() {
        let org_id = Uuid::new_v4();
        let (store, _, webhook) = processor(vec![tenant(org_id, "cus_1")]);

        let applied = webhook
            .update_subscription("cus_1", &event("active", Some("price_pro_456")))
            .await;
        assert!(applied);

        let row = store.get(org_id).unwrap();
        assert_eq!(row.plan.as_deref(), Some(PRO_PLAN_ID));
        assert_eq!(row.max_candidates, Some(50));
        assert_eq!(row.max_team_members, Some(10));
        assert_eq!(row.subscription_status.as_deref(), Some("active"));
        assert_eq!(row.stripe_subscription_id.as_deref(), Some("sub_abc"));
    }

    #[tokio::test]
    async fn test_unknown_price_leaves_plan_and_caps_untouched() {
        let org_id = Uuid::new_v4();
        let (store, _, webhook) = processor(vec![tenant(org_id, "cus_1")]);

        let applied = webhook
            .update_subscription("cus_1", &event("past_due", Some("price_mystery")))
            .await;
        assert!(applied);

        let row = store.get(org_id).unwrap();
        assert_eq!(row.plan.as_deref(), Some(BASIC_PLAN_ID));
        assert_eq!(row.max_candidates, Some(10));
        assert_eq!(row.subscription_status.as_deref(), Some("past_due"));
        assert_eq!(row.stripe_subscription_id.as_deref(), Some("sub_abc"));
    }

    #[tokio::test]
    async fn test_enterprise_price_clears_caps_to_unlimited() {
        let org_id = Uuid::new_v4();
        let (store, _, webhook) = processor(vec![tenant(org_id, "cus_1")]);

        let applied = webhook
            .update_subscription("cus_1", &event("active", Some("price_ent_789")))
            .await;
        assert!(applied);

        let row = store.get(org_id).unwrap();
        assert_eq!(row.plan.as_deref(), Some(ENTERPRISE_PLAN_ID));
        assert_eq!(row.max_candidates, None);
        assert_eq!(row.max_team_members, None);
    }

    #[tokio::test]
    async fn test_successful_update_invalidates_resolver_cache() {
        let org_id = Uuid::new_v4();
        let (_, resolver, webhook) = processor(vec![tenant(org_id, "cus_1")]);

        // Warm the cache on the inactive basic row.
        let before = resolver.subscription_context(org_id).await.unwrap().unwrap();
        assert!(!before.is_active);

        let applied = webhook
            .update_subscription("cus_1", &event("active", Some("price_pro_456")))
            .await;
        assert!(applied);

        // The write is visible immediately, not after a TTL.
        let after = resolver.subscription_context(org_id).await.unwrap().unwrap();
        assert!(after.is_active);
        assert_eq!(after.plan_id, PRO_PLAN_ID);
    }

    #[tokio::test]
    async fn test_verbatim_status_storage() {
        let org_id = Uuid::new_v4();
        let (store, _, webhook) = processor(vec![tenant(org_id, "cus_1")]);

        // No transition validation: whatever the provider sends is stored.
        let applied = webhook
            .update_subscription("cus_1", &event("some_future_status", None))
            .await;
        assert!(applied);
        assert_eq!(
            store.get(org_id).unwrap().subscription_status.as_deref(),
            Some("some_future_status")
        );
    }

    #[test]
    fn test_epoch_conversion() {
        assert!(epoch_to_datetime(None).is_none());
        assert!(epoch_to_datetime(Some(0)).is_none());
        assert!(epoch_to_datetime(Some(-5)).is_none());
        let dt = epoch_to_datetime(Some(1_700_000_000)).unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_price_map_lookup() {
        let prices = PriceMap::for_tests("price_b", "price_p", "price_e");
        assert_eq!(prices.plan_for("price_b"), Some(BASIC_PLAN_ID));
        assert_eq!(prices.plan_for("price_p"), Some(PRO_PLAN_ID));
        assert_eq!(prices.plan_for("price_e"), Some(ENTERPRISE_PLAN_ID));
        assert_eq!(prices.plan_for("price_unknown"), None);

        // Unconfigured tiers degrade to "no mapping".
        let empty = PriceMap::default();
        assert_eq!(empty.plan_for("price_b"), None);
    }
}
