//! `substrate-sandbox` — per-tenant capability limits and the tenant
//! registry that binds each tenant to its own isolated execution context.

mod limits;
mod tenant;

pub use limits::{Limits, UsageCounters};
pub use tenant::{Tenant, TenantManager};
