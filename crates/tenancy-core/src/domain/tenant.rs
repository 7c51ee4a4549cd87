// ============================================================================
// Tenancy Core - Tenant Entity
// File: crates/tenancy-core/src/domain/tenant.rs
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A single isolated customer/organization. Every tenant-owned row
/// references exactly one tenant; the first tenant created is the
/// template tenant whose rows serve as seed data for new tenants.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Tenant {
    pub id: Uuid,

    #[validate(length(min = 2, max = 255, message = "Tenant name must be between 2 and 255 characters"))]
    pub name: String,

    /// Unique routing key, e.g. `acme.example.com`. A request resolver
    /// maps an inbound hostname to a tenant through this field.
    #[validate(length(min = 1, max = 255, message = "Domain must be between 1 and 255 characters"))]
    pub domain: String,

    pub is_active: bool,

    // Audit
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn new(name: String, domain: String) -> Result<Self, validator::ValidationErrors> {
        let now = Utc::now();
        let tenant = Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            domain: domain.trim().to_lowercase(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        tenant.validate()?;
        Ok(tenant)
    }

    /// Soft deactivation. Tenants are never hard-deleted while rows
    /// reference them.
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }
}
