// ============================================================================
// Tenancy Core - Tenant-Scoped Query Layer
// File: crates/tenancy-core/src/scope.rs
// ============================================================================
//! Transparent tenant filtering for queries over registered record types.
//!
//! Queries are value objects ([`RecordQuery`]); stores interpret them.
//! [`TenantScope::scope`] injects an equality filter on the tenant
//! reference exactly once, reading the ambient [`TenantContext`]. When
//! no tenant is installed the outcome is governed by [`ScopePolicy`]:
//! strict raises a typed error naming the record type and call site,
//! lenient degrades to an empty result and warns once per call site.
//! There is no failure direction that returns another tenant's rows.

use std::collections::HashSet;
use std::panic::Location;
use std::sync::{Mutex, OnceLock};

use tracing::warn;
use uuid::Uuid;

use crate::context::TenantContext;
use crate::domain::Tenant;
use crate::error::TenancyError;
use crate::registry::RecordDescriptor;

/// A declarative query over one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    pub record_type: String,
    /// Equality filter on the owning-tenant column.
    pub tenant_filter: Option<Uuid>,
    /// Explicit escape hatch: filtering disabled for this query chain.
    pub across_all_tenants: bool,
    /// Lenient degradation: the store returns no rows at all.
    pub empty: bool,
}

impl RecordQuery {
    pub fn new(record_type: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            tenant_filter: None,
            across_all_tenants: false,
            empty: false,
        }
    }

    /// Always filters by the given tenant, regardless of ambient
    /// context. For administrative code.
    pub fn filter_by_tenant(mut self, tenant: &Tenant) -> Self {
        self.tenant_filter = Some(tenant.id);
        self.across_all_tenants = false;
        self
    }

    /// Disable automatic tenant filtering for this query chain. Opt-in
    /// by name so it cannot be invoked by accident; admin/system use
    /// only.
    pub fn all_tenants(mut self) -> Self {
        self.across_all_tenants = true;
        self.tenant_filter = None;
        self
    }

    pub fn has_tenant_filter(&self) -> bool {
        self.tenant_filter.is_some()
    }
}

/// Missing-tenant policy, split into its two independent dimensions:
/// whether we are inside a live unit of work, and whether scoping is
/// mandatory there. Only the combination of both is strict; queries
/// built outside a unit of work (startup, imports) always degrade to
/// empty results instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopePolicy {
    pub in_unit_of_work: bool,
    pub scoping_required: bool,
}

impl ScopePolicy {
    /// Live unit of work with mandatory scoping.
    pub fn strict() -> Self {
        Self {
            in_unit_of_work: true,
            scoping_required: true,
        }
    }

    /// Outside any unit of work (startup, import, maintenance).
    pub fn lenient() -> Self {
        Self {
            in_unit_of_work: false,
            scoping_required: false,
        }
    }

    /// Policy for a live unit of work, with the mandatory-scoping
    /// dimension taken from configuration.
    pub fn for_unit_of_work(settings: &tenancy_shared::config::TenancySettings) -> Self {
        Self {
            in_unit_of_work: true,
            scoping_required: settings.scoping_required,
        }
    }

    pub fn is_strict(&self) -> bool {
        self.in_unit_of_work && self.scoping_required
    }
}

impl Default for ScopePolicy {
    fn default() -> Self {
        Self::strict()
    }
}

/// Entry point for tenant-scoped query construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct TenantScope {
    policy: ScopePolicy,
}

impl TenantScope {
    pub fn new(policy: ScopePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ScopePolicy {
        self.policy
    }

    /// Build a query over `descriptor` scoped to the ambient tenant.
    #[track_caller]
    pub fn scoped_query(
        &self,
        ctx: &TenantContext,
        descriptor: &RecordDescriptor,
    ) -> Result<RecordQuery, TenancyError> {
        self.scope_at(ctx, RecordQuery::new(descriptor.record_type.clone()), Location::caller())
    }

    /// Inject the ambient tenant filter into an existing query.
    /// Idempotent: a query that already carries a tenant filter (or the
    /// all-tenants escape) is returned unchanged.
    #[track_caller]
    pub fn scope(
        &self,
        ctx: &TenantContext,
        query: RecordQuery,
    ) -> Result<RecordQuery, TenancyError> {
        self.scope_at(ctx, query, Location::caller())
    }

    fn scope_at(
        &self,
        ctx: &TenantContext,
        mut query: RecordQuery,
        origin: &'static Location<'static>,
    ) -> Result<RecordQuery, TenancyError> {
        if query.across_all_tenants || query.has_tenant_filter() {
            return Ok(query);
        }

        match ctx.get() {
            Some(tenant) => {
                query.tenant_filter = Some(tenant.id);
                Ok(query)
            }
            None if self.policy.is_strict() => Err(TenancyError::MissingTenant {
                record_type: query.record_type.clone(),
                origin: origin.to_string(),
            }),
            None => {
                warn_missing_tenant_once(&query.record_type, origin);
                query.empty = true;
                Ok(query)
            }
        }
    }
}

static WARNED_SITES: OnceLock<Mutex<HashSet<(&'static str, u32, u32)>>> = OnceLock::new();

/// Warn about a lenient missing-tenant degradation, once per unique
/// call site, so startup-time query construction does not flood logs.
fn warn_missing_tenant_once(record_type: &str, origin: &'static Location<'static>) {
    let sites = WARNED_SITES.get_or_init(|| Mutex::new(HashSet::new()));
    let key = (origin.file(), origin.line(), origin.column());
    let first = match sites.lock() {
        Ok(mut seen) => seen.insert(key),
        Err(_) => true,
    };
    if first {
        warn!(
            record_type,
            origin = %origin,
            "no ambient tenant; query degraded to an empty result"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{FieldDescriptor, FieldKind};

    fn product_descriptor() -> RecordDescriptor {
        RecordDescriptor::new("product", "products")
            .field(FieldDescriptor::new("name", FieldKind::Text))
    }

    fn tenant(domain: &str) -> Tenant {
        Tenant::new("Tenant".to_string(), domain.to_string()).unwrap()
    }

    #[test]
    fn test_scoped_query_filters_by_ambient_tenant() {
        let mut ctx = TenantContext::new();
        let acme = tenant("acme.example.com");
        ctx.set(acme.clone());

        let scope = TenantScope::new(ScopePolicy::strict());
        let query = scope.scoped_query(&ctx, &product_descriptor()).unwrap();
        assert_eq!(query.tenant_filter, Some(acme.id));
        assert!(!query.empty);
    }

    #[test]
    fn test_scope_is_idempotent() {
        let mut ctx = TenantContext::new();
        let acme = tenant("acme.example.com");
        ctx.set(acme.clone());

        let scope = TenantScope::new(ScopePolicy::strict());
        let once = scope.scoped_query(&ctx, &product_descriptor()).unwrap();
        let twice = scope.scope(&ctx, once.clone()).unwrap();
        assert_eq!(once, twice);

        // Even under a different ambient tenant, an existing filter is
        // not rewritten.
        ctx.set(tenant("globex.example.com"));
        let kept = scope.scope(&ctx, once.clone()).unwrap();
        assert_eq!(kept.tenant_filter, Some(acme.id));
    }

    #[test]
    fn test_missing_tenant_strict_errors_with_origin() {
        let ctx = TenantContext::new();
        let scope = TenantScope::new(ScopePolicy::strict());
        let err = scope.scoped_query(&ctx, &product_descriptor()).unwrap_err();
        match err {
            TenancyError::MissingTenant {
                record_type,
                origin,
            } => {
                assert_eq!(record_type, "product");
                assert!(origin.contains("scope.rs"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_tenant_lenient_degrades_to_empty() {
        let ctx = TenantContext::new();
        let scope = TenantScope::new(ScopePolicy::lenient());
        let query = scope.scoped_query(&ctx, &product_descriptor()).unwrap();
        assert!(query.empty);
        assert_eq!(query.tenant_filter, None);
    }

    #[test]
    fn test_policy_matrix() {
        // Only in_unit_of_work && scoping_required is strict.
        for (in_uow, required, strict) in [
            (true, true, true),
            (true, false, false),
            (false, true, false),
            (false, false, false),
        ] {
            let policy = ScopePolicy {
                in_unit_of_work: in_uow,
                scoping_required: required,
            };
            assert_eq!(policy.is_strict(), strict);

            let ctx = TenantContext::new();
            let scope = TenantScope::new(policy);
            let result = scope.scoped_query(&ctx, &product_descriptor());
            assert_eq!(result.is_err(), strict);
        }
    }

    #[test]
    fn test_filter_by_tenant_overrides_ambient() {
        let mut ctx = TenantContext::new();
        ctx.set(tenant("acme.example.com"));
        let globex = tenant("globex.example.com");

        let query = RecordQuery::new("product").filter_by_tenant(&globex);
        // Scoping afterwards must not replace the explicit filter.
        let scope = TenantScope::new(ScopePolicy::strict());
        let scoped = scope.scope(&ctx, query).unwrap();
        assert_eq!(scoped.tenant_filter, Some(globex.id));
    }

    #[test]
    fn test_all_tenants_escape_hatch() {
        let ctx = TenantContext::new();
        let scope = TenantScope::new(ScopePolicy::strict());
        let query = RecordQuery::new("product").all_tenants();
        // No ambient tenant, strict policy: the explicit escape still
        // passes through untouched.
        let scoped = scope.scope(&ctx, query).unwrap();
        assert!(scoped.across_all_tenants);
        assert_eq!(scoped.tenant_filter, None);
        assert!(!scoped.empty);
    }
}
