//! Tenant repository trait (port)

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::Tenant;
use crate::error::TenancyError;

#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Tenant>, TenancyError>;

    /// Resolve a routing key to an active tenant. Backs the external
    /// per-request resolver.
    async fn find_by_domain(&self, domain: &str) -> Result<Option<Tenant>, TenancyError>;

    /// The template tenant: earliest-created active tenant, `None`
    /// before the first tenant is provisioned.
    async fn find_template(&self) -> Result<Option<Tenant>, TenancyError>;

    async fn create(&self, tenant: &Tenant) -> Result<Tenant, TenancyError>;

    /// Soft deactivation; rows referencing the tenant stay in place.
    async fn deactivate(&self, id: &Uuid) -> Result<(), TenancyError>;
}
