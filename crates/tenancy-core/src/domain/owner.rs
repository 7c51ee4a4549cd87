//! Owner identity created alongside a freshly provisioned tenant

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TenantOwner {
    pub id: Uuid,

    /// Fixed at creation time, immutable afterwards.
    pub tenant_id: Uuid,

    #[validate(length(min = 2, max = 150, message = "Username must be between 2 and 150 characters"))]
    pub username: String,

    #[validate(email)]
    pub email: String,

    pub password_hash: String,

    pub is_admin: bool,
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
}

impl TenantOwner {
    pub fn new(
        tenant_id: Uuid,
        username: String,
        email: String,
        password_hash: String,
    ) -> Result<Self, validator::ValidationErrors> {
        let owner = Self {
            id: Uuid::new_v4(),
            tenant_id,
            username: username.trim().to_string(),
            email: email.trim().to_lowercase(),
            password_hash,
            is_admin: true,
            is_active: true,
            created_at: Utc::now(),
        };

        owner.validate()?;
        Ok(owner)
    }
}
