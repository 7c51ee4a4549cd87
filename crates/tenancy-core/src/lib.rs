//! # Tenancy Core
//!
//! Row-level multi-tenancy for a relational store: tenant-scoped
//! queries, a static record-type registry, template cloning in
//! foreign-key dependency order, and atomic tenant provisioning.

pub mod clone;
pub mod context;
pub mod domain;
pub mod error;
pub mod graph;
pub mod provision;
pub mod record;
pub mod registry;
pub mod repositories;
pub mod scope;

pub use clone::{CloneEngine, CloneOptions, CloneSummary};
pub use context::{ActiveTenant, TenantContext};
pub use domain::{Tenant, TenantOwner};
pub use error::TenancyError;
pub use graph::dependency_order;
pub use provision::{NewOwner, NewTenant, Provisioned, TenantProvisioner};
pub use record::{FieldValue, RecordRow};
pub use registry::{
    CloneMode, FieldDescriptor, FieldKind, ForeignKeyDescriptor, RecordDescriptor, RecordRegistry,
};
pub use scope::{RecordQuery, ScopePolicy, TenantScope};
