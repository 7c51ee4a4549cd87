// ============================================================================
// Tenancy Core - Record Type Registry
// File: crates/tenancy-core/src/registry.rs
// ============================================================================
//! Static registry of tenant-owned record types.
//!
//! Replaces runtime reflection with explicit metadata populated at
//! startup: field shapes, foreign keys, and per-type clone behavior.
//! Stores and the cloning engine are driven entirely by these
//! descriptors.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::TenancyError;
use crate::record::FieldValue;

/// Scalar shape of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Uuid,
    Json,
}

impl FieldKind {
    /// The safe "blank" value used by skeleton-mode cloning. `None`
    /// means the kind has no safe non-null default (only `Uuid`:
    /// fabricating a reference would point at an arbitrary row).
    pub fn skeleton_default(&self) -> Option<FieldValue> {
        match self {
            FieldKind::Text => Some(FieldValue::Text(String::new())),
            FieldKind::Integer => Some(FieldValue::Integer(0)),
            FieldKind::Float => Some(FieldValue::Float(0.0)),
            FieldKind::Boolean => Some(FieldValue::Boolean(false)),
            FieldKind::Timestamp => Some(FieldValue::Timestamp(Utc::now())),
            FieldKind::Json => Some(FieldValue::Json(serde_json::json!({}))),
            FieldKind::Uuid => None,
        }
    }
}

/// How a record type's template rows are cloned into a new tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloneMode {
    /// Copy all fields verbatim (foreign keys remapped).
    #[default]
    Full,
    /// Copy only fields without a safe blank value; reset the rest.
    Skeleton,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub nullable: bool,
    pub unique: bool,
    /// Declared default, used in preference to the kind's blank value
    /// during skeleton cloning.
    pub default: Option<FieldValue>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
            unique: false,
            default: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_default(mut self, value: FieldValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Required fields are copied verbatim in skeleton mode: blanking
    /// them would violate not-null constraints.
    pub fn is_required(&self) -> bool {
        !self.nullable && self.default.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDescriptor {
    /// Field carrying the reference; must also appear in `fields` with
    /// kind `Uuid`.
    pub field: String,
    pub target_type: String,
    pub nullable: bool,
}

/// Static description of one tenant-owned record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDescriptor {
    pub record_type: String,
    pub table: String,
    /// Column holding the owning-tenant reference.
    pub tenant_column: String,
    pub fields: Vec<FieldDescriptor>,
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
    pub clone_mode: CloneMode,
    /// Per-type fixed overrides applied after copying. Declaring these
    /// together with skeleton mode resolves to overrides (with a
    /// warning) at clone time.
    pub clone_field_overrides: BTreeMap<String, FieldValue>,
    /// Fields never copied into clones (the id and tenant columns are
    /// always excluded).
    pub clone_exclude_fields: Vec<String>,
}

impl RecordDescriptor {
    pub fn new(record_type: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            table: table.into(),
            tenant_column: "tenant_id".to_string(),
            fields: Vec::new(),
            foreign_keys: Vec::new(),
            clone_mode: CloneMode::Full,
            clone_field_overrides: BTreeMap::new(),
            clone_exclude_fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn foreign_key(
        mut self,
        field: impl Into<String>,
        target_type: impl Into<String>,
        nullable: bool,
    ) -> Self {
        let field = field.into();
        self.fields.push(FieldDescriptor {
            name: field.clone(),
            kind: FieldKind::Uuid,
            nullable,
            unique: false,
            default: None,
        });
        self.foreign_keys.push(ForeignKeyDescriptor {
            field,
            target_type: target_type.into(),
            nullable,
        });
        self
    }

    pub fn clone_mode(mut self, mode: CloneMode) -> Self {
        self.clone_mode = mode;
        self
    }

    pub fn clone_field_override(mut self, field: impl Into<String>, value: FieldValue) -> Self {
        self.clone_field_overrides.insert(field.into(), value);
        self
    }

    pub fn clone_exclude_field(mut self, field: impl Into<String>) -> Self {
        self.clone_exclude_fields.push(field.into());
        self
    }

    pub fn field_descriptor(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn foreign_key_for(&self, field: &str) -> Option<&ForeignKeyDescriptor> {
        self.foreign_keys.iter().find(|fk| fk.field == field)
    }

    fn check(&self) -> Result<(), TenancyError> {
        let invalid = |reason: String| TenancyError::InvalidDescriptor {
            record_type: self.record_type.clone(),
            reason,
        };

        if !is_valid_identifier(&self.table) {
            return Err(invalid(format!("invalid table name '{}'", self.table)));
        }
        if !is_valid_identifier(&self.tenant_column) {
            return Err(invalid(format!(
                "invalid tenant column '{}'",
                self.tenant_column
            )));
        }

        let mut seen = std::collections::BTreeSet::new();
        for field in &self.fields {
            if !is_valid_identifier(&field.name) {
                return Err(invalid(format!("invalid field name '{}'", field.name)));
            }
            if field.name == "id" || field.name == self.tenant_column {
                return Err(invalid(format!(
                    "field '{}' collides with a reserved column",
                    field.name
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(invalid(format!("duplicate field '{}'", field.name)));
            }
        }

        for fk in &self.foreign_keys {
            match self.field_descriptor(&fk.field) {
                Some(field) if field.kind == FieldKind::Uuid => {}
                Some(field) => {
                    return Err(invalid(format!(
                        "foreign key '{}' must be a uuid field, found {:?}",
                        fk.field, field.kind
                    )))
                }
                None => {
                    return Err(invalid(format!(
                        "foreign key '{}' has no matching field entry",
                        fk.field
                    )))
                }
            }
        }

        for excluded in &self.clone_exclude_fields {
            if self.field_descriptor(excluded).is_none() {
                return Err(invalid(format!(
                    "clone-excluded field '{}' is not declared",
                    excluded
                )));
            }
        }

        Ok(())
    }
}

/// Identifiers are interpolated into SQL by the stores; restrict them
/// to the unquoted-identifier alphabet.
fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Registry of all tenant-owned record types, populated at startup.
#[derive(Debug, Default)]
pub struct RecordRegistry {
    descriptors: BTreeMap<String, RecordDescriptor>,
}

impl RecordRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: RecordDescriptor) -> Result<(), TenancyError> {
        if !is_valid_identifier(&descriptor.record_type) {
            return Err(TenancyError::InvalidDescriptor {
                record_type: descriptor.record_type.clone(),
                reason: "record type must be a valid identifier".to_string(),
            });
        }
        descriptor.check()?;
        if self.descriptors.contains_key(&descriptor.record_type) {
            return Err(TenancyError::DuplicateRecordType(
                descriptor.record_type.clone(),
            ));
        }
        self.descriptors
            .insert(descriptor.record_type.clone(), descriptor);
        Ok(())
    }

    pub fn get(&self, record_type: &str) -> Result<&RecordDescriptor, TenancyError> {
        self.descriptors
            .get(record_type)
            .ok_or_else(|| TenancyError::UnknownRecordType(record_type.to_string()))
    }

    pub fn contains(&self, record_type: &str) -> bool {
        self.descriptors.contains_key(record_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecordDescriptor> {
        self.descriptors.values()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Configuration lint: a `unique = true` field on a cloneable type
    /// is not tenant-scoped at the store level, so cloning template
    /// rows into a second tenant will collide. Returns one warning per
    /// offending type.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for descriptor in self.descriptors.values() {
            let unique_fields: Vec<&str> = descriptor
                .fields
                .iter()
                .filter(|f| f.unique)
                .map(|f| f.name.as_str())
                .collect();
            if !unique_fields.is_empty() {
                warnings.push(format!(
                    "record type '{}' has unique fields [{}] that are not tenant-scoped; \
                     cloning template rows will violate uniqueness unless the constraint \
                     is widened to (tenant, field)",
                    descriptor.record_type,
                    unique_fields.join(", ")
                ));
            }
        }
        warnings
    }
}
