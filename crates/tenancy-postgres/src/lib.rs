//! # Tenancy Postgres
//!
//! PostgreSQL adapters for the tenancy ports.

pub mod connection;
pub mod owner_repo;
pub mod record_store;
pub mod sql;
pub mod tenant_repo;

pub use connection::create_pool;
pub use owner_repo::PgOwnerRepository;
pub use record_store::{PgRecordStore, PgRecordTx};
pub use tenant_repo::PgTenantRepository;
