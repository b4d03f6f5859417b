use std::collections::HashMap;
use std::time::Instant;

use parking_lot::RwLock;
use substrate_error::{ErrorKind, ScriptError};
use substrate_runtime::{ExecutionContext, GuestHandle};

use crate::limits::{Limits, UsageCounters};

/// One isolated guest runtime instance plus the limits and usage it is
/// bound to. `context` is never shared between tenants and the manager
/// never holds its write lock across a guest call — only around the
/// lookup that hands the caller a reference.
pub struct Tenant<G: GuestHandle> {
    pub id: String,
    pub display_name: String,
    pub context: ExecutionContext<G>,
    pub limits: Limits,
    pub usage: UsageCounters,
    pub created_at: Instant,
}

/// Process-wide registry of tenants, each with its own [`ExecutionContext`]
/// and [`Limits`]. Mirrors the userdata/weak-ref registries' concurrency
/// shape: a short-lived write lock guards the map itself, never the work
/// done with an entry once it is out.
pub struct TenantManager<G: GuestHandle> {
    tenants: RwLock<HashMap<String, Tenant<G>>>,
}

impl<G: GuestHandle> Default for TenantManager<G> {
    fn default() -> Self {
        Self {
            tenants: RwLock::new(HashMap::new()),
        }
    }
}

impl<G: GuestHandle> TenantManager<G> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &self,
        id: impl Into<String>,
        display_name: impl Into<String>,
        context: ExecutionContext<G>,
        limits: Limits,
    ) -> Result<(), ScriptError> {
        let id = id.into();
        let mut tenants = self.tenants.write();
        if tenants.contains_key(&id) {
            return Err(ScriptError::new(
                ErrorKind::TenantAlreadyExists,
                format!("tenant '{id}' already exists"),
            ));
        }
        tenants.insert(
            id.clone(),
            Tenant {
                id,
                display_name: display_name.into(),
                context,
                limits,
                usage: UsageCounters::default(),
                created_at: Instant::now(),
            },
        );
        Ok(())
    }

    pub fn remove(&self, id: &str) -> Result<(), ScriptError> {
        self.tenants
            .write()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ScriptError::new(ErrorKind::TenantNotFound, format!("tenant '{id}' not found")))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tenants.read().contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.tenants.read().keys().cloned().collect()
    }

    /// Check a call against the tenant's remaining call budget before
    /// charging it, recording the call only if the budget allows it.
    pub fn record_call(&self, id: &str) -> Result<(), ScriptError> {
        let mut tenants = self.tenants.write();
        let tenant = tenants
            .get_mut(id)
            .ok_or_else(|| ScriptError::new(ErrorKind::TenantNotFound, format!("tenant '{id}' not found")))?;
        if tenant.usage.calls_made >= tenant.limits.max_calls {
            return Err(ScriptError::new(
                ErrorKind::CapacityExceeded,
                format!("tenant '{id}' exceeded its {}-call limit", tenant.limits.max_calls),
            ));
        }
        tenant.usage.calls_made += 1;
        Ok(())
    }

    pub fn with_tenant<R>(&self, id: &str, f: impl FnOnce(&Tenant<G>) -> R) -> Result<R, ScriptError> {
        let tenants = self.tenants.read();
        let tenant = tenants
            .get(id)
            .ok_or_else(|| ScriptError::new(ErrorKind::TenantNotFound, format!("tenant '{id}' not found")))?;
        Ok(f(tenant))
    }

    pub fn with_tenant_mut<R>(&self, id: &str, f: impl FnOnce(&mut Tenant<G>) -> R) -> Result<R, ScriptError> {
        let mut tenants = self.tenants.write();
        let tenant = tenants
            .get_mut(id)
            .ok_or_else(|| ScriptError::new(ErrorKind::TenantNotFound, format!("tenant '{id}' not found")))?;
        Ok(f(tenant))
    }
}
