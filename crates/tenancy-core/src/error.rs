//! Tenancy errors

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum TenancyError {
    #[error(
        "No ambient tenant for tenant-scoped type '{record_type}' at {origin}. \
         Install a tenant into the TenantContext for this unit of work, or set \
         the tenant explicitly."
    )]
    MissingTenant {
        record_type: String,
        origin: String,
    },

    #[error("Unknown record type: {0}")]
    UnknownRecordType(String),

    #[error("Record type already registered: {0}")]
    DuplicateRecordType(String),

    #[error("Invalid record descriptor for '{record_type}': {reason}")]
    InvalidDescriptor {
        record_type: String,
        reason: String,
    },

    #[error("Cyclic foreign-key dependency among record types: {}", .0.join(", "))]
    CyclicDependency(Vec<String>),

    #[error("Failed to clone {record_type} (source id {source_id}): {reason}")]
    CloneFailure {
        record_type: String,
        source_id: Uuid,
        reason: String,
    },

    #[error(
        "No safe skeleton default for required field '{field}' of '{record_type}': {reason}"
    )]
    UnsafeSkeletonDefault {
        record_type: String,
        field: String,
        reason: String,
    },

    #[error(
        "Foreign key '{field}' of {record_type} (source id {source_id}) references \
         {target_type} row {target_id} which was not cloned and the field is not nullable"
    )]
    UnresolvedRequiredReference {
        record_type: String,
        source_id: Uuid,
        field: String,
        target_type: String,
        target_id: Uuid,
    },

    #[error("Tenant not found")]
    TenantNotFound,

    #[error("Tenant domain already exists: {0}")]
    TenantDomainAlreadyExists(String),

    #[error("Owner username already exists: {0}")]
    OwnerUsernameAlreadyExists(String),

    #[error("Tenant provisioning failed: {0}")]
    ProvisioningFailed(#[source] Box<TenancyError>),

    #[error("Password hash error: {0}")]
    PasswordHashError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<validator::ValidationErrors> for TenancyError {
    fn from(errors: validator::ValidationErrors) -> Self {
        TenancyError::ValidationError(errors.to_string())
    }
}
