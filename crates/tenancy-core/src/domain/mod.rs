//! Domain entities

pub mod owner;
pub mod tenant;

pub use owner::TenantOwner;
pub use tenant::Tenant;
