// Subscription billing & entitlements.
// Plan catalog → context resolver → feature/limit gate, plus the webhook
// mapper that mutates the tenant rows the resolver reads.

pub mod entitlements;
pub mod handlers;
pub mod plans;
pub mod resolver;
pub mod store;
pub mod subscription;
pub mod webhook;
