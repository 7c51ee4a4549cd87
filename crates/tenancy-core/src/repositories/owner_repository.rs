//! Owner repository trait (port)

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::TenantOwner;
use crate::error::TenancyError;

#[async_trait]
pub trait OwnerRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<TenantOwner>, TenancyError>;
    async fn find_by_tenant(&self, tenant_id: &Uuid) -> Result<Vec<TenantOwner>, TenancyError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<TenantOwner>, TenancyError>;
    async fn create(&self, owner: &TenantOwner) -> Result<TenantOwner, TenancyError>;
}
