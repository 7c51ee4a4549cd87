// ============================================================================
// Tenancy Core - Ambient Tenant Context
// File: crates/tenancy-core/src/context.rs
// ============================================================================
//! Per-unit-of-work holder of the current tenant identity.
//!
//! Each unit of work (request, task) owns exactly one `TenantContext` and
//! threads it through the calls that need scoping. Contexts are never
//! shared between concurrent units of work, so no locking is involved.
//! The preferred way to install a tenant is [`TenantContext::activate`],
//! which returns a guard that clears the context on every exit path —
//! including panics and task cancellation — before the execution context
//! can be reused.

use crate::domain::Tenant;

#[derive(Debug, Default)]
pub struct TenantContext {
    current: Option<Tenant>,
}

impl TenantContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current tenant for this unit of work.
    pub fn set(&mut self, tenant: Tenant) {
        self.current = Some(tenant);
    }

    /// The current tenant, if any.
    pub fn get(&self) -> Option<&Tenant> {
        self.current.as_ref()
    }

    /// Clear the current tenant. Must run unconditionally at the end of
    /// a unit of work; prefer [`activate`](Self::activate) which does
    /// this automatically.
    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Install `tenant` and receive a guard that clears the context
    /// when dropped.
    pub fn activate(&mut self, tenant: Tenant) -> ActiveTenant<'_> {
        self.set(tenant);
        ActiveTenant { ctx: self }
    }
}

/// RAII guard over an activated tenant context.
pub struct ActiveTenant<'a> {
    ctx: &'a mut TenantContext,
}

impl ActiveTenant<'_> {
    pub fn tenant(&self) -> &Tenant {
        // Invariant: set by activate, cleared only on drop.
        self.ctx.get().unwrap()
    }

    pub fn context(&self) -> &TenantContext {
        self.ctx
    }
}

impl Drop for ActiveTenant<'_> {
    fn drop(&mut self) {
        self.ctx.clear();
    }
}
