//! Record store trait (port)
//!
//! Metadata-driven access to tenant-owned rows. Reads interpret
//! [`RecordQuery`] values produced by the scoped query layer; writes go
//! through a [`RecordTx`] so cloning and provisioning stay atomic.

use async_trait::async_trait;

use crate::domain::{Tenant, TenantOwner};
use crate::error::TenancyError;
use crate::record::RecordRow;
use crate::registry::RecordDescriptor;
use crate::scope::RecordQuery;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch rows of one record type. An `empty` query returns no rows
    /// without touching the store; `across_all_tenants` skips the
    /// tenant filter; otherwise the query's tenant filter applies.
    async fn fetch(
        &self,
        descriptor: &RecordDescriptor,
        query: &RecordQuery,
    ) -> Result<Vec<RecordRow>, TenancyError>;

    /// Begin a write transaction. Dropping the transaction without
    /// committing rolls it back.
    async fn begin(&self) -> Result<Box<dyn RecordTx>, TenancyError>;
}

#[async_trait]
pub trait RecordTx: Send {
    async fn insert_record(
        &mut self,
        descriptor: &RecordDescriptor,
        row: &RecordRow,
    ) -> Result<RecordRow, TenancyError>;

    async fn insert_tenant(&mut self, tenant: &Tenant) -> Result<Tenant, TenancyError>;

    async fn insert_owner(&mut self, owner: &TenantOwner) -> Result<TenantOwner, TenancyError>;

    async fn commit(self: Box<Self>) -> Result<(), TenancyError>;

    async fn rollback(self: Box<Self>) -> Result<(), TenancyError>;
}
