//! Dynamic row representation for tenant-owned record types.
//!
//! Record types are described by registry metadata rather than
//! compile-time structs, so rows travel as typed field maps. Stores
//! translate between these maps and their native representation.

use std::collections::BTreeMap;
use std::panic::Location;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::TenantContext;
use crate::error::TenancyError;

/// A single field value. Variants mirror
/// [`FieldKind`](crate::registry::FieldKind) plus `Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
    Json(serde_json::Value),
    Null,
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// The referenced row id, when this value is a foreign key.
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            FieldValue::Uuid(id) => Some(*id),
            _ => None,
        }
    }
}

/// One persisted row of a registered record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordRow {
    pub record_type: String,
    pub id: Uuid,
    /// `None` only for rows that predate tenant assignment; template
    /// tenant rows carry the template tenant's id like any other row.
    pub tenant_id: Option<Uuid>,
    pub fields: BTreeMap<String, FieldValue>,
}

impl RecordRow {
    pub fn new(record_type: impl Into<String>, tenant_id: Option<Uuid>) -> Self {
        Self {
            record_type: record_type.into(),
            id: Uuid::new_v4(),
            tenant_id,
            fields: BTreeMap::new(),
        }
    }

    /// Like [`new`](Self::new) but takes the owning tenant from the
    /// ambient context. Writes never degrade: building a row with no
    /// tenant installed is an error, whatever the read policy says.
    #[track_caller]
    pub fn new_scoped(
        record_type: impl Into<String>,
        ctx: &TenantContext,
    ) -> Result<Self, TenancyError> {
        let record_type = record_type.into();
        match ctx.get() {
            Some(tenant) => Ok(Self::new(record_type, Some(tenant.id))),
            None => Err(TenancyError::MissingTenant {
                record_type,
                origin: Location::caller().to_string(),
            }),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}
