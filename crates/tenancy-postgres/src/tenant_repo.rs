// ============================================================================
// Tenancy Postgres - Tenant Repository
// File: crates/tenancy-postgres/src/tenant_repo.rs
// ============================================================================
//! PostgreSQL tenant repository over a `tenants` table:
//! `(id uuid pk, name text, domain text unique, is_active bool,
//! created_at timestamptz, updated_at timestamptz)`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{error, info};
use uuid::Uuid;

use tenancy_core::repositories::TenantRepository;
use tenancy_core::{Tenant, TenancyError};

pub struct PgTenantRepository {
    pool: PgPool,
}

impl PgTenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct TenantRow {
    pub id: Uuid,
    pub name: String,
    pub domain: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TenantRow> for Tenant {
    fn from(row: TenantRow) -> Self {
        Tenant {
            id: row.id,
            name: row.name,
            domain: row.domain,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn db_error(context: &str, e: sqlx::Error) -> TenancyError {
    error!("Database error {}: {}", context, e);
    TenancyError::DatabaseError(e.to_string())
}

#[async_trait]
impl TenantRepository for PgTenantRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Tenant>, TenancyError> {
        let row: Option<TenantRow> = sqlx::query_as(
            r#"
            SELECT id, name, domain, is_active, created_at, updated_at
            FROM tenants
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("finding tenant by id", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Option<Tenant>, TenancyError> {
        let row: Option<TenantRow> = sqlx::query_as(
            r#"
            SELECT id, name, domain, is_active, created_at, updated_at
            FROM tenants
            WHERE LOWER(domain) = LOWER($1) AND is_active
            "#,
        )
        .bind(domain)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("finding tenant by domain", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_template(&self) -> Result<Option<Tenant>, TenancyError> {
        let row: Option<TenantRow> = sqlx::query_as(
            r#"
            SELECT id, name, domain, is_active, created_at, updated_at
            FROM tenants
            WHERE is_active
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("finding template tenant", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn create(&self, tenant: &Tenant) -> Result<Tenant, TenancyError> {
        info!("Creating tenant: {}", tenant.domain);

        let row: TenantRow = sqlx::query_as(
            r#"
            INSERT INTO tenants (id, name, domain, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, domain, is_active, created_at, updated_at
            "#,
        )
        .bind(tenant.id)
        .bind(&tenant.name)
        .bind(&tenant.domain)
        .bind(tenant.is_active)
        .bind(tenant.created_at)
        .bind(tenant.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating tenant: {}", e);
            let msg = e.to_string();
            if msg.contains("unique") || msg.contains("duplicate") {
                TenancyError::TenantDomainAlreadyExists(tenant.domain.clone())
            } else {
                TenancyError::DatabaseError(msg)
            }
        })?;

        info!("Tenant created successfully: {}", row.id);
        Ok(row.into())
    }

    async fn deactivate(&self, id: &Uuid) -> Result<(), TenancyError> {
        let result = sqlx::query(
            r#"
            UPDATE tenants
            SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("deactivating tenant", e))?;

        if result.rows_affected() == 0 {
            return Err(TenancyError::TenantNotFound);
        }
        Ok(())
    }
}
