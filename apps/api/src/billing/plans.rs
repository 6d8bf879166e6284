#![allow(dead_code)]

//! Plan Catalog — the static table of subscription tiers and their entitlements.
//!
//! Built once at startup and treated as immutable for the life of the process.
//! Changing plan data means redeploying; there is no runtime plan editing.
//! Every plan id referenced anywhere else in the codebase must exist here —
//! `get_or_basic` resolves unknown/absent ids to the Basic tier.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const BASIC_PLAN_ID: &str = "agency_basic";
pub const PRO_PLAN_ID: &str = "agency_pro";
pub const ENTERPRISE_PLAN_ID: &str = "agency_enterprise";

/// Feature-map keys. Use these constants instead of raw strings at call sites.
pub mod features {
    pub const CV_TEMPLATES: &str = "cv_templates";
    pub const API_ACCESS: &str = "api_access";
    pub const AI_TOOLS: &str = "ai_tools";
    pub const BROWSER_EXTENSION: &str = "browser_extension";
    pub const CUSTOM_BRANDING: &str = "custom_branding";
}

/// A resource cap: either a hard numeric limit or explicitly unlimited.
/// Serialized as the number itself, or `null` for unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cap {
    Limited(u32),
    Unlimited,
}

impl Cap {
    /// Whether one more entry can be added given `current` existing entries.
    pub fn allows(&self, current: u64) -> bool {
        match self {
            Cap::Unlimited => true,
            Cap::Limited(max) => current < u64::from(*max),
        }
    }

    /// The numeric limit, or `None` for unlimited.
    pub fn value(&self) -> Option<u32> {
        match self {
            Cap::Limited(max) => Some(*max),
            Cap::Unlimited => None,
        }
    }
}

/// A single feature entitlement: a boolean flag or a list of allowed values
/// (e.g. CV template names).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Flag(bool),
    List(Vec<String>),
}

impl FeatureValue {
    /// Boolean view: a false flag and a list value both read as `false` —
    /// list-valued features are addressed through their own accessors.
    pub fn as_flag(&self) -> bool {
        matches!(self, FeatureValue::Flag(true))
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FeatureValue::List(items) => Some(items),
            FeatureValue::Flag(_) => None,
        }
    }
}

/// One subscription tier: price, caps, and the feature map.
#[derive(Debug, Clone, Serialize)]
pub struct PlanDefinition {
    pub id: &'static str,
    pub label: &'static str,
    /// Monthly price in minor units (cents).
    pub price_cents: u32,
    pub currency: &'static str,
    pub max_candidates: Cap,
    pub max_team_members: Cap,
    /// Word ceiling applied to generated CV bodies.
    pub max_cv_words: Cap,
    pub features: HashMap<&'static str, FeatureValue>,
}

impl PlanDefinition {
    /// Boolean feature check. Absent entries and list-valued entries are false.
    pub fn has_feature(&self, name: &str) -> bool {
        self.features.get(name).map(FeatureValue::as_flag).unwrap_or(false)
    }

    /// The CV template names this plan may render.
    pub fn cv_templates(&self) -> &[String] {
        self.features
            .get(features::CV_TEMPLATES)
            .and_then(FeatureValue::as_list)
            .unwrap_or(&[])
    }
}

/// The immutable plan table. Constructed once in `main` and shared via `Arc`.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    plans: HashMap<&'static str, PlanDefinition>,
}

impl PlanCatalog {
    pub fn new() -> Self {
        let mut plans = HashMap::new();

        plans.insert(
            BASIC_PLAN_ID,
            PlanDefinition {
                id: BASIC_PLAN_ID,
                label: "Agency Basic",
                price_cents: 1900,
                currency: "usd",
                max_candidates: Cap::Limited(10),
                max_team_members: Cap::Limited(3),
                max_cv_words: Cap::Limited(600),
                features: feature_map([
                    (features::CV_TEMPLATES, template_list(&["minimal", "classic"])),
                    (features::BROWSER_EXTENSION, FeatureValue::Flag(true)),
                    (features::AI_TOOLS, FeatureValue::Flag(false)),
                    (features::CUSTOM_BRANDING, FeatureValue::Flag(false)),
                    (features::API_ACCESS, FeatureValue::Flag(false)),
                ]),
            },
        );

        plans.insert(
            PRO_PLAN_ID,
            PlanDefinition {
                id: PRO_PLAN_ID,
                label: "Agency Pro",
                price_cents: 4900,
                currency: "usd",
                max_candidates: Cap::Limited(50),
                max_team_members: Cap::Limited(10),
                max_cv_words: Cap::Limited(1200),
                features: feature_map([
                    (
                        features::CV_TEMPLATES,
                        template_list(&["minimal", "classic", "modern", "compact"]),
                    ),
                    (features::BROWSER_EXTENSION, FeatureValue::Flag(true)),
                    (features::AI_TOOLS, FeatureValue::Flag(true)),
                    (features::CUSTOM_BRANDING, FeatureValue::Flag(true)),
                    (features::API_ACCESS, FeatureValue::Flag(false)),
                ]),
            },
        );

        plans.insert(
            ENTERPRISE_PLAN_ID,
            PlanDefinition {
                id: ENTERPRISE_PLAN_ID,
                label: "Agency Enterprise",
                price_cents: 9900,
                currency: "usd",
                max_candidates: Cap::Unlimited,
                max_team_members: Cap::Unlimited,
                max_cv_words: Cap::Unlimited,
                features: feature_map([
                    (
                        features::CV_TEMPLATES,
                        template_list(&["minimal", "classic", "modern", "compact", "executive"]),
                    ),
                    (features::BROWSER_EXTENSION, FeatureValue::Flag(true)),
                    (features::AI_TOOLS, FeatureValue::Flag(true)),
                    (features::CUSTOM_BRANDING, FeatureValue::Flag(true)),
                    (features::API_ACCESS, FeatureValue::Flag(true)),
                ]),
            },
        );

        PlanCatalog { plans }
    }

    pub fn get(&self, plan_id: &str) -> Option<&PlanDefinition> {
        self.plans.get(plan_id)
    }

    /// Resolve a stored plan id, falling back to Basic when the id is absent
    /// or unknown to the catalog.
    pub fn get_or_basic(&self, plan_id: Option<&str>) -> &PlanDefinition {
        plan_id.and_then(|id| self.plans.get(id)).unwrap_or_else(|| self.basic())
    }

    /// The Basic tier — the single source of truth for default entitlements.
    pub fn basic(&self) -> &PlanDefinition {
        &self.plans[BASIC_PLAN_ID]
    }

    pub fn contains(&self, plan_id: &str) -> bool {
        self.plans.contains_key(plan_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlanDefinition> {
        self.plans.values()
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn feature_map<const N: usize>(
    entries: [(&'static str, FeatureValue); N],
) -> HashMap<&'static str, FeatureValue> {
    entries.into_iter().collect()
}

fn template_list(names: &[&str]) -> FeatureValue {
    FeatureValue::List(names.iter().map(|n| n.to_string()).collect())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
