//! Repository traits (ports)

pub mod owner_repository;
pub mod record_store;
pub mod tenant_repository;

pub use owner_repository::OwnerRepository;
pub use record_store::{RecordStore, RecordTx};
pub use tenant_repository::TenantRepository;
