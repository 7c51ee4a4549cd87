//! In-memory store and repositories for integration tests.
//!
//! Transactions stage writes and only merge them into the shared state
//! on commit, which lets the suites assert rollback behavior. A
//! per-type failure injection simulates row insert errors mid-run.

// Each test binary compiles its own copy and uses a different subset.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use tenancy_core::record::RecordRow;
use tenancy_core::registry::RecordDescriptor;
use tenancy_core::repositories::{OwnerRepository, RecordStore, RecordTx, TenantRepository};
use tenancy_core::scope::RecordQuery;
use tenancy_core::{Tenant, TenancyError, TenantOwner};

#[derive(Debug, Default)]
struct State {
    records: Vec<RecordRow>,
    tenants: Vec<Tenant>,
    owners: Vec<TenantOwner>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    fail_on_type: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_tenant(&self, tenant: &Tenant) {
        self.state.lock().unwrap().tenants.push(tenant.clone());
    }

    pub fn seed_record(&self, row: RecordRow) {
        self.state.lock().unwrap().records.push(row);
    }

    /// Make every insert of `record_type` fail, for atomicity tests.
    pub fn fail_on(&self, record_type: &str) {
        *self.fail_on_type.lock().unwrap() = Some(record_type.to_string());
    }

    pub fn records_for_tenant(&self, tenant_id: Uuid) -> Vec<RecordRow> {
        self.state
            .lock()
            .unwrap()
            .records
            .iter()
            .filter(|r| r.tenant_id == Some(tenant_id))
            .cloned()
            .collect()
    }

    pub fn count_for_tenant(&self, record_type: &str, tenant_id: Uuid) -> usize {
        self.records_for_tenant(tenant_id)
            .iter()
            .filter(|r| r.record_type == record_type)
            .count()
    }

    pub fn tenants(&self) -> Vec<Tenant> {
        self.state.lock().unwrap().tenants.clone()
    }

    pub fn owners(&self) -> Vec<TenantOwner> {
        self.state.lock().unwrap().owners.clone()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch(
        &self,
        descriptor: &RecordDescriptor,
        query: &RecordQuery,
    ) -> Result<Vec<RecordRow>, TenancyError> {
        if query.empty {
            return Ok(Vec::new());
        }
        let state = self.state.lock().unwrap();
        Ok(state
            .records
            .iter()
            .filter(|r| r.record_type == descriptor.record_type)
            .filter(|r| match query.tenant_filter {
                _ if query.across_all_tenants => true,
                Some(tenant_id) => r.tenant_id == Some(tenant_id),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn begin(&self) -> Result<Box<dyn RecordTx>, TenancyError> {
        Ok(Box::new(MemoryTx {
            store: self.clone(),
            staged: State::default(),
        }))
    }
}

pub struct MemoryTx {
    store: MemoryStore,
    staged: State,
}

#[async_trait]
impl RecordTx for MemoryTx {
    async fn insert_record(
        &mut self,
        _descriptor: &RecordDescriptor,
        row: &RecordRow,
    ) -> Result<RecordRow, TenancyError> {
        let fail_on = self.store.fail_on_type.lock().unwrap().clone();
        if fail_on.as_deref() == Some(row.record_type.as_str()) {
            return Err(TenancyError::DatabaseError(
                "simulated insert failure".to_string(),
            ));
        }
        self.staged.records.push(row.clone());
        Ok(row.clone())
    }

    async fn insert_tenant(&mut self, tenant: &Tenant) -> Result<Tenant, TenancyError> {
        self.staged.tenants.push(tenant.clone());
        Ok(tenant.clone())
    }

    async fn insert_owner(&mut self, owner: &TenantOwner) -> Result<TenantOwner, TenancyError> {
        self.staged.owners.push(owner.clone());
        Ok(owner.clone())
    }

    async fn commit(self: Box<Self>) -> Result<(), TenancyError> {
        let mut state = self.store.state.lock().unwrap();
        state.records.extend(self.staged.records);
        state.tenants.extend(self.staged.tenants);
        state.owners.extend(self.staged.owners);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), TenancyError> {
        // Staged writes are simply discarded.
        Ok(())
    }
}

/// Tenant repository over the same shared state.
#[derive(Clone)]
pub struct MemoryTenantRepository {
    store: MemoryStore,
}

impl MemoryTenantRepository {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TenantRepository for MemoryTenantRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Tenant>, TenancyError> {
        Ok(self.store.tenants().into_iter().find(|t| t.id == *id))
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Option<Tenant>, TenancyError> {
        Ok(self
            .store
            .tenants()
            .into_iter()
            .find(|t| t.domain == domain && t.is_active))
    }

    async fn find_template(&self) -> Result<Option<Tenant>, TenancyError> {
        let mut tenants: Vec<Tenant> = self
            .store
            .tenants()
            .into_iter()
            .filter(|t| t.is_active)
            .collect();
        tenants.sort_by_key(|t| t.created_at);
        Ok(tenants.into_iter().next())
    }

    async fn create(&self, tenant: &Tenant) -> Result<Tenant, TenancyError> {
        self.store.seed_tenant(tenant);
        Ok(tenant.clone())
    }

    async fn deactivate(&self, id: &Uuid) -> Result<(), TenancyError> {
        let mut state = self.store.state.lock().unwrap();
        match state.tenants.iter_mut().find(|t| t.id == *id) {
            Some(tenant) => {
                tenant.deactivate();
                Ok(())
            }
            None => Err(TenancyError::TenantNotFound),
        }
    }
}

#[derive(Clone)]
pub struct MemoryOwnerRepository {
    store: MemoryStore,
}

impl MemoryOwnerRepository {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl OwnerRepository for MemoryOwnerRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<TenantOwner>, TenancyError> {
        Ok(self.store.owners().into_iter().find(|o| o.id == *id))
    }

    async fn find_by_tenant(&self, tenant_id: &Uuid) -> Result<Vec<TenantOwner>, TenancyError> {
        Ok(self
            .store
            .owners()
            .into_iter()
            .filter(|o| o.tenant_id == *tenant_id)
            .collect())
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<TenantOwner>, TenancyError> {
        Ok(self
            .store
            .owners()
            .into_iter()
            .find(|o| o.username == username))
    }

    async fn create(&self, owner: &TenantOwner) -> Result<TenantOwner, TenancyError> {
        self.store.state.lock().unwrap().owners.push(owner.clone());
        Ok(owner.clone())
    }
}

pub fn tenant(name: &str, domain: &str) -> Tenant {
    Tenant::new(name.to_string(), domain.to_string()).unwrap()
}
