use anyhow::{Context, Result};

use crate::billing::resolver::ActivePolicy;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing; the Stripe price ids
/// are optional — an unconfigured tier simply never maps from a webhook.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    pub stripe_price_basic: Option<String>,
    pub stripe_price_pro: Option<String>,
    pub stripe_price_enterprise: Option<String>,
    pub entitlement_cache_ttl_secs: u64,
    pub active_policy: ActivePolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            stripe_price_basic: optional_env("STRIPE_PRICE_BASIC"),
            stripe_price_pro: optional_env("STRIPE_PRICE_PRO"),
            stripe_price_enterprise: optional_env("STRIPE_PRICE_ENTERPRISE"),
            entitlement_cache_ttl_secs: std::env::var("ENTITLEMENT_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse::<u64>()
                .context("ENTITLEMENT_CACHE_TTL_SECS must be a number of seconds")?,
            active_policy: ActivePolicy::from_str_or_default(
                std::env::var("SUBSCRIPTION_ACTIVE_POLICY").ok().as_deref(),
            ),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
