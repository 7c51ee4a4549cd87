//! PostgreSQL owner repository over a `tenant_owners` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{error, info};
use uuid::Uuid;

use tenancy_core::repositories::OwnerRepository;
use tenancy_core::{TenancyError, TenantOwner};

pub struct PgOwnerRepository {
    pool: PgPool,
}

impl PgOwnerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct OwnerRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<OwnerRow> for TenantOwner {
    fn from(row: OwnerRow) -> Self {
        TenantOwner {
            id: row.id,
            tenant_id: row.tenant_id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            is_admin: row.is_admin,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

const OWNER_COLUMNS: &str =
    "id, tenant_id, username, email, password_hash, is_admin, is_active, created_at";

fn db_error(context: &str, e: sqlx::Error) -> TenancyError {
    error!("Database error {}: {}", context, e);
    TenancyError::DatabaseError(e.to_string())
}

#[async_trait]
impl OwnerRepository for PgOwnerRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<TenantOwner>, TenancyError> {
        let row: Option<OwnerRow> = sqlx::query_as(&format!(
            "SELECT {OWNER_COLUMNS} FROM tenant_owners WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("finding owner by id", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_by_tenant(&self, tenant_id: &Uuid) -> Result<Vec<TenantOwner>, TenancyError> {
        let rows: Vec<OwnerRow> = sqlx::query_as(&format!(
            "SELECT {OWNER_COLUMNS} FROM tenant_owners WHERE tenant_id = $1 ORDER BY created_at"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("finding owners by tenant", e))?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<TenantOwner>, TenancyError> {
        let row: Option<OwnerRow> = sqlx::query_as(&format!(
            "SELECT {OWNER_COLUMNS} FROM tenant_owners WHERE LOWER(username) = LOWER($1)"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("finding owner by username", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn create(&self, owner: &TenantOwner) -> Result<TenantOwner, TenancyError> {
        info!("Creating owner: {}", owner.username);

        let row: OwnerRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO tenant_owners ({OWNER_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {OWNER_COLUMNS}
            "#
        ))
        .bind(owner.id)
        .bind(owner.tenant_id)
        .bind(&owner.username)
        .bind(&owner.email)
        .bind(&owner.password_hash)
        .bind(owner.is_admin)
        .bind(owner.is_active)
        .bind(owner.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating owner: {}", e);
            let msg = e.to_string();
            if msg.contains("unique") || msg.contains("duplicate") {
                TenancyError::OwnerUsernameAlreadyExists(owner.username.clone())
            } else {
                TenancyError::DatabaseError(msg)
            }
        })?;

        Ok(row.into())
    }
}
