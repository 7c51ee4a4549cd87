// ============================================================================
// Tenancy Core - Provisioning Workflow
// File: crates/tenancy-core/src/provision.rs
// ============================================================================
//! Creates a tenant, its first owner identity, and its default data as
//! one atomic operation.

use std::sync::Arc;

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHasher};
use tracing::{info, warn};

use crate::clone::{CloneEngine, CloneOptions, CloneSummary};
use crate::domain::{Tenant, TenantOwner};
use crate::error::TenancyError;
use crate::registry::RecordRegistry;
use crate::repositories::{RecordStore, TenantRepository};

#[derive(Debug, Clone)]
pub struct NewTenant {
    pub name: String,
    pub domain: String,
}

#[derive(Debug, Clone)]
pub struct NewOwner {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Provisioned {
    pub tenant: Tenant,
    pub owner: TenantOwner,
    pub summary: CloneSummary,
}

pub struct TenantProvisioner {
    tenants: Arc<dyn TenantRepository>,
    store: Arc<dyn RecordStore>,
    engine: CloneEngine,
}

impl TenantProvisioner {
    pub fn new(
        tenants: Arc<dyn TenantRepository>,
        store: Arc<dyn RecordStore>,
        registry: Arc<RecordRegistry>,
    ) -> Self {
        let engine = CloneEngine::new(registry, store.clone());
        Self {
            tenants,
            store,
            engine,
        }
    }

    /// Create tenant, owner, and cloned default data in one
    /// transaction. Any step failing leaves no trace of the tenant.
    ///
    /// The owner's tenant is fixed to the new tenant explicitly; no
    /// ambient context exists for a tenant that is not yet visible.
    pub async fn provision(
        &self,
        tenant_data: NewTenant,
        owner_data: NewOwner,
        options: &CloneOptions,
    ) -> Result<Provisioned, TenancyError> {
        info!(domain = %tenant_data.domain, "provisioning tenant");

        // Routing-key uniqueness among active tenants; the store's
        // constraint is the final authority.
        if self
            .tenants
            .find_by_domain(&tenant_data.domain)
            .await?
            .is_some()
        {
            return Err(TenancyError::TenantDomainAlreadyExists(tenant_data.domain));
        }

        let template = self.tenants.find_template().await?;

        let tenant = Tenant::new(tenant_data.name, tenant_data.domain)?;
        let password_hash = hash_password(&owner_data.password)?;
        let owner = TenantOwner::new(
            tenant.id,
            owner_data.username,
            owner_data.email,
            password_hash,
        )?;

        let mut tx = self.store.begin().await?;
        let result = async {
            let tenant = tx.insert_tenant(&tenant).await?;
            let owner = tx.insert_owner(&owner).await?;

            let summary = match &template {
                Some(template) => {
                    self.engine
                        .clone_all_in(tx.as_mut(), &tenant, template, options)
                        .await?
                }
                None => {
                    // First tenant ever: it becomes the template, there
                    // is nothing to clone from.
                    warn!(domain = %tenant.domain, "no template tenant exists; skipping clone");
                    CloneSummary::default()
                }
            };

            Ok::<Provisioned, TenancyError>(Provisioned {
                tenant,
                owner,
                summary,
            })
        }
        .await;

        match result {
            Ok(provisioned) => {
                tx.commit().await?;
                info!(
                    domain = %provisioned.tenant.domain,
                    cloned = provisioned.summary.total(),
                    "tenant provisioned"
                );
                Ok(provisioned)
            }
            Err(err) => {
                let _ = tx.rollback().await;
                Err(TenancyError::ProvisioningFailed(Box::new(err)))
            }
        }
    }
}

fn hash_password(password: &str) -> Result<String, TenancyError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| TenancyError::PasswordHashError(e.to_string()))
}
