// ============================================================================
// Tenancy Postgres - Record Store
// File: crates/tenancy-postgres/src/record_store.rs
// ============================================================================
//! Metadata-driven record store: SQL is generated from registry
//! descriptors, values are bound and decoded per declared field kind.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::error;
use uuid::Uuid;

use tenancy_core::record::{FieldValue, RecordRow};
use tenancy_core::registry::{FieldDescriptor, FieldKind, RecordDescriptor};
use tenancy_core::repositories::{RecordStore, RecordTx};
use tenancy_core::scope::RecordQuery;
use tenancy_core::{Tenant, TenancyError, TenantOwner};

use crate::sql::{insert_sql, select_sql};

pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_error(context: &str, e: sqlx::Error) -> TenancyError {
    error!("Database error {}: {}", context, e);
    TenancyError::DatabaseError(e.to_string())
}

fn bind_field<'q>(
    query: Query<'q, Postgres, PgArguments>,
    field: &FieldDescriptor,
    value: &FieldValue,
) -> Result<Query<'q, Postgres, PgArguments>, TenancyError> {
    let query = match (field.kind, value) {
        (FieldKind::Text, FieldValue::Text(v)) => query.bind(v.clone()),
        (FieldKind::Text, FieldValue::Null) => query.bind(None::<String>),
        (FieldKind::Integer, FieldValue::Integer(v)) => query.bind(*v),
        (FieldKind::Integer, FieldValue::Null) => query.bind(None::<i64>),
        (FieldKind::Float, FieldValue::Float(v)) => query.bind(*v),
        (FieldKind::Float, FieldValue::Null) => query.bind(None::<f64>),
        (FieldKind::Boolean, FieldValue::Boolean(v)) => query.bind(*v),
        (FieldKind::Boolean, FieldValue::Null) => query.bind(None::<bool>),
        (FieldKind::Timestamp, FieldValue::Timestamp(v)) => query.bind(*v),
        (FieldKind::Timestamp, FieldValue::Null) => query.bind(None::<DateTime<Utc>>),
        (FieldKind::Uuid, FieldValue::Uuid(v)) => query.bind(*v),
        (FieldKind::Uuid, FieldValue::Null) => query.bind(None::<Uuid>),
        (FieldKind::Json, FieldValue::Json(v)) => query.bind(v.clone()),
        (FieldKind::Json, FieldValue::Null) => query.bind(None::<serde_json::Value>),
        (kind, value) => {
            return Err(TenancyError::DatabaseError(format!(
                "value {value:?} does not match declared kind {kind:?} of field '{}'",
                field.name
            )))
        }
    };
    Ok(query)
}

fn decode_field(row: &PgRow, field: &FieldDescriptor) -> Result<FieldValue, TenancyError> {
    let name = field.name.as_str();
    let decode_err = |e: sqlx::Error| {
        TenancyError::DatabaseError(format!("decoding column '{name}': {e}"))
    };
    let value = match field.kind {
        FieldKind::Text => row
            .try_get::<Option<String>, _>(name)
            .map_err(decode_err)?
            .map(FieldValue::Text),
        FieldKind::Integer => row
            .try_get::<Option<i64>, _>(name)
            .map_err(decode_err)?
            .map(FieldValue::Integer),
        FieldKind::Float => row
            .try_get::<Option<f64>, _>(name)
            .map_err(decode_err)?
            .map(FieldValue::Float),
        FieldKind::Boolean => row
            .try_get::<Option<bool>, _>(name)
            .map_err(decode_err)?
            .map(FieldValue::Boolean),
        FieldKind::Timestamp => row
            .try_get::<Option<DateTime<Utc>>, _>(name)
            .map_err(decode_err)?
            .map(FieldValue::Timestamp),
        FieldKind::Uuid => row
            .try_get::<Option<Uuid>, _>(name)
            .map_err(decode_err)?
            .map(FieldValue::Uuid),
        FieldKind::Json => row
            .try_get::<Option<serde_json::Value>, _>(name)
            .map_err(decode_err)?
            .map(FieldValue::Json),
    };
    Ok(value.unwrap_or(FieldValue::Null))
}

fn decode_row(row: &PgRow, descriptor: &RecordDescriptor) -> Result<RecordRow, TenancyError> {
    let id: Uuid = row
        .try_get("id")
        .map_err(|e| TenancyError::DatabaseError(format!("decoding column 'id': {e}")))?;
    let tenant_id: Option<Uuid> = row
        .try_get(descriptor.tenant_column.as_str())
        .map_err(|e| {
            TenancyError::DatabaseError(format!(
                "decoding column '{}': {e}",
                descriptor.tenant_column
            ))
        })?;

    let mut record = RecordRow::new(descriptor.record_type.clone(), tenant_id);
    record.id = id;
    for field in &descriptor.fields {
        record
            .fields
            .insert(field.name.clone(), decode_field(row, field)?);
    }
    Ok(record)
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn fetch(
        &self,
        descriptor: &RecordDescriptor,
        query: &RecordQuery,
    ) -> Result<Vec<RecordRow>, TenancyError> {
        if query.empty {
            return Ok(Vec::new());
        }

        let filter = !query.across_all_tenants && query.tenant_filter.is_some();
        let sql = select_sql(descriptor, filter);
        let mut q = sqlx::query(&sql);
        if filter {
            q = q.bind(query.tenant_filter.unwrap());
        }
        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("fetching records", e))?;

        rows.iter().map(|row| decode_row(row, descriptor)).collect()
    }

    async fn begin(&self) -> Result<Box<dyn RecordTx>, TenancyError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("beginning transaction", e))?;
        Ok(Box::new(PgRecordTx { tx }))
    }
}

pub struct PgRecordTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl RecordTx for PgRecordTx {
    async fn insert_record(
        &mut self,
        descriptor: &RecordDescriptor,
        row: &RecordRow,
    ) -> Result<RecordRow, TenancyError> {
        let sql = insert_sql(descriptor);
        let mut query = sqlx::query(&sql).bind(row.id).bind(row.tenant_id);
        for field in &descriptor.fields {
            let value = row.field(&field.name).unwrap_or(&FieldValue::Null);
            query = bind_field(query, field, value)?;
        }
        query
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error("inserting record", e))?;
        Ok(row.clone())
    }

    async fn insert_tenant(&mut self, tenant: &Tenant) -> Result<Tenant, TenancyError> {
        sqlx::query(
            r#"
            INSERT INTO tenants (id, name, domain, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(tenant.id)
        .bind(&tenant.name)
        .bind(&tenant.domain)
        .bind(tenant.is_active)
        .bind(tenant.created_at)
        .bind(tenant.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("unique") || msg.contains("duplicate") {
                TenancyError::TenantDomainAlreadyExists(tenant.domain.clone())
            } else {
                db_error("inserting tenant", e)
            }
        })?;
        Ok(tenant.clone())
    }

    async fn insert_owner(&mut self, owner: &TenantOwner) -> Result<TenantOwner, TenancyError> {
        sqlx::query(
            r#"
            INSERT INTO tenant_owners
                (id, tenant_id, username, email, password_hash, is_admin, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(owner.id)
        .bind(owner.tenant_id)
        .bind(&owner.username)
        .bind(&owner.email)
        .bind(&owner.password_hash)
        .bind(owner.is_admin)
        .bind(owner.is_active)
        .bind(owner.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("inserting owner", e))?;
        Ok(owner.clone())
    }

    async fn commit(self: Box<Self>) -> Result<(), TenancyError> {
        self.tx
            .commit()
            .await
            .map_err(|e| db_error("committing transaction", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), TenancyError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| db_error("rolling back transaction", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_field_rejects_kind_mismatch() {
        let field = FieldDescriptor::new("stock", FieldKind::Integer);
        let query = sqlx::query("SELECT 1");
        let result = bind_field(query, &field, &FieldValue::Text("seven".into()));
        assert!(result.is_err());
    }
}
