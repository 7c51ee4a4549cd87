// ============================================================================
// Tenancy Core - Template Cloning Engine
// File: crates/tenancy-core/src/clone.rs
// ============================================================================
//! Clones the template tenant's rows into a freshly created tenant.
//!
//! Record types are cloned in foreign-key dependency order. An
//! ephemeral clone map `(type, old id) -> new row` rewrites every
//! intra-run foreign key to the corresponding new-tenant row before it
//! is needed, so clones never reference template rows. The whole run
//! executes in one transaction; any per-row failure aborts and rolls
//! back everything.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::Tenant;
use crate::error::TenancyError;
use crate::graph::dependency_order;
use crate::record::{FieldValue, RecordRow};
use crate::registry::{CloneMode, FieldDescriptor, RecordDescriptor, RecordRegistry};
use crate::repositories::{RecordStore, RecordTx};
use crate::scope::RecordQuery;

/// Caller-supplied knobs for one cloning run.
#[derive(Debug, Clone, Default)]
pub struct CloneOptions {
    /// Record types left out of the run entirely.
    pub excluded_types: Vec<String>,
    /// Runtime field overrides per record type, applied last (highest
    /// precedence, above per-type clone metadata).
    pub field_overrides: BTreeMap<String, BTreeMap<String, FieldValue>>,
}

/// Per-type clone counts for one completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneSummary {
    per_type: BTreeMap<String, usize>,
}

impl CloneSummary {
    pub fn count(&self, record_type: &str) -> usize {
        self.per_type.get(record_type).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.per_type.values().sum()
    }

    pub fn per_type(&self) -> &BTreeMap<String, usize> {
        &self.per_type
    }
}

/// Mode actually applied to a type, after resolving the metadata
/// conflict between skeleton mode and per-type field overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EffectiveMode {
    Full,
    Skeleton,
    FieldOverrides,
}

struct CloneStep<'a> {
    descriptor: &'a RecordDescriptor,
    mode: EffectiveMode,
    rows: Vec<RecordRow>,
}

pub struct CloneEngine {
    registry: Arc<RecordRegistry>,
    store: Arc<dyn RecordStore>,
}

impl CloneEngine {
    pub fn new(registry: Arc<RecordRegistry>, store: Arc<dyn RecordStore>) -> Self {
        Self { registry, store }
    }

    /// Clone every registered record type with at least one template
    /// row into `target`, inside a transaction owned by this call.
    pub async fn clone_all(
        &self,
        target: &Tenant,
        template: &Tenant,
        options: &CloneOptions,
    ) -> Result<CloneSummary, TenancyError> {
        let steps = self.prepare(template, options).await?;
        let mut tx = self.store.begin().await?;
        match run_steps(&steps, target, options, tx.as_mut()).await {
            Ok(summary) => {
                tx.commit().await?;
                Ok(summary)
            }
            Err(err) => {
                // Best effort: dropping the tx also rolls back.
                let _ = tx.rollback().await;
                Err(err)
            }
        }
    }

    /// Like [`clone_all`](Self::clone_all) but runs inside a caller's
    /// transaction, so provisioning can keep tenant + owner + clone
    /// atomic as one unit.
    pub async fn clone_all_in(
        &self,
        tx: &mut dyn RecordTx,
        target: &Tenant,
        template: &Tenant,
        options: &CloneOptions,
    ) -> Result<CloneSummary, TenancyError> {
        let steps = self.prepare(template, options).await?;
        run_steps(&steps, target, options, tx).await
    }

    /// Discovery, skeleton-viability prechecks, and dependency
    /// ordering. Runs before any write so configuration errors never
    /// surface mid-transaction. Template reads go through the store
    /// directly: provisioning is single-writer, template data is stable
    /// for the duration of a run.
    async fn prepare(
        &self,
        template: &Tenant,
        options: &CloneOptions,
    ) -> Result<Vec<CloneStep<'_>>, TenancyError> {
        let mut included = Vec::new();
        let mut rows_by_type: HashMap<String, Vec<RecordRow>> = HashMap::new();

        for descriptor in self.registry.iter() {
            if options
                .excluded_types
                .iter()
                .any(|t| t == &descriptor.record_type)
            {
                continue;
            }
            let query =
                RecordQuery::new(descriptor.record_type.clone()).filter_by_tenant(template);
            let rows = self.store.fetch(descriptor, &query).await?;
            if rows.is_empty() {
                // A type with no template rows is simply absent from
                // the run, not an error.
                continue;
            }
            rows_by_type.insert(descriptor.record_type.clone(), rows);
            included.push(descriptor);
        }

        let mut modes: HashMap<&str, EffectiveMode> = HashMap::new();
        for descriptor in &included {
            precheck_excluded_fields(descriptor)?;
            let mode = effective_mode(descriptor);
            if mode == EffectiveMode::Skeleton {
                let row_count = rows_by_type[&descriptor.record_type].len();
                precheck_skeleton(descriptor, row_count)?;
            }
            modes.insert(descriptor.record_type.as_str(), mode);
        }

        let ordered = dependency_order(&included)?;
        info!(
            order = ?ordered.iter().map(|d| d.record_type.as_str()).collect::<Vec<_>>(),
            template = %template.domain,
            "cloning record types in dependency order"
        );

        Ok(ordered
            .into_iter()
            .map(|descriptor| CloneStep {
                descriptor,
                mode: modes[descriptor.record_type.as_str()],
                rows: rows_by_type.remove(&descriptor.record_type).unwrap_or_default(),
            })
            .collect())
    }
}

async fn run_steps(
    steps: &[CloneStep<'_>],
    target: &Tenant,
    options: &CloneOptions,
    tx: &mut dyn RecordTx,
) -> Result<CloneSummary, TenancyError> {
    let included_types: HashSet<&str> = steps
        .iter()
        .map(|s| s.descriptor.record_type.as_str())
        .collect();
    let mut clone_map: HashMap<(String, Uuid), RecordRow> = HashMap::new();
    let mut summary = CloneSummary::default();

    for step in steps {
        let record_type = step.descriptor.record_type.as_str();
        let runtime_overrides = options.field_overrides.get(record_type);
        info!(
            record_type,
            rows = step.rows.len(),
            mode = ?step.mode,
            "cloning template rows"
        );

        for original in &step.rows {
            let clone = build_clone(
                step.descriptor,
                step.mode,
                original,
                target,
                &clone_map,
                &included_types,
                runtime_overrides,
            )?;

            let created = tx
                .insert_record(step.descriptor, &clone)
                .await
                .map_err(|err| TenancyError::CloneFailure {
                    record_type: record_type.to_string(),
                    source_id: original.id,
                    reason: err.to_string(),
                })?;

            clone_map.insert((record_type.to_string(), original.id), created);
            *summary
                .per_type
                .entry(record_type.to_string())
                .or_insert(0) += 1;
        }
    }

    info!(
        total = summary.total(),
        types = summary.per_type.len(),
        "clone run complete"
    );
    Ok(summary)
}

/// Assemble the field map for one clone: mode extraction, foreign-key
/// remapping through the clone map, forced tenant, runtime overrides
/// last.
fn build_clone(
    descriptor: &RecordDescriptor,
    mode: EffectiveMode,
    original: &RecordRow,
    target: &Tenant,
    clone_map: &HashMap<(String, Uuid), RecordRow>,
    included_types: &HashSet<&str>,
    runtime_overrides: Option<&BTreeMap<String, FieldValue>>,
) -> Result<RecordRow, TenancyError> {
    let mut fields: BTreeMap<String, FieldValue> = BTreeMap::new();

    for field in &descriptor.fields {
        if descriptor.clone_exclude_fields.contains(&field.name) {
            let value = field
                .default
                .clone()
                .unwrap_or(FieldValue::Null);
            fields.insert(field.name.clone(), value);
            continue;
        }

        let original_value = original
            .field(&field.name)
            .cloned()
            .unwrap_or(FieldValue::Null);

        let value = match mode {
            EffectiveMode::Full | EffectiveMode::FieldOverrides => original_value,
            EffectiveMode::Skeleton => {
                skeleton_value(field, descriptor.foreign_key_for(&field.name).is_some())
                    .unwrap_or(original_value)
            }
        };
        fields.insert(field.name.clone(), value);
    }

    // Fields fixed by per-type metadata skip foreign-key resolution.
    let mut fixed: HashSet<&str> = HashSet::new();
    if mode == EffectiveMode::FieldOverrides {
        for (name, value) in &descriptor.clone_field_overrides {
            fields.insert(name.clone(), value.clone());
            fixed.insert(name.as_str());
        }
    } else if mode == EffectiveMode::Skeleton {
        // Skeleton already replaced every non-required field; FKs are
        // nullable by precheck and sit at Null.
        for fk in &descriptor.foreign_keys {
            fixed.insert(fk.field.as_str());
        }
    }
    if let Some(overrides) = runtime_overrides {
        for name in overrides.keys() {
            fixed.insert(name.as_str());
        }
    }

    for fk in &descriptor.foreign_keys {
        if fixed.contains(fk.field.as_str()) {
            continue;
        }
        if !included_types.contains(fk.target_type.as_str()) {
            // Reference outside this run: left verbatim.
            continue;
        }
        let Some(old_id) = fields.get(&fk.field).and_then(FieldValue::as_uuid) else {
            continue; // null reference stays null
        };
        match clone_map.get(&(fk.target_type.clone(), old_id)) {
            Some(new_row) => {
                fields.insert(fk.field.clone(), FieldValue::Uuid(new_row.id));
            }
            None if fk.nullable => {
                // Dependency-order or input-set bug; survivable for a
                // nullable edge.
                warn!(
                    record_type = %descriptor.record_type,
                    field = %fk.field,
                    target_type = %fk.target_type,
                    %old_id,
                    "foreign key target was not cloned; copying original reference"
                );
            }
            None => {
                return Err(TenancyError::UnresolvedRequiredReference {
                    record_type: descriptor.record_type.clone(),
                    source_id: original.id,
                    field: fk.field.clone(),
                    target_type: fk.target_type.clone(),
                    target_id: old_id,
                });
            }
        }
    }

    // Runtime overrides win over everything, except the tenant itself.
    if let Some(overrides) = runtime_overrides {
        for (name, value) in overrides {
            fields.insert(name.clone(), value.clone());
        }
    }

    let mut clone = RecordRow::new(descriptor.record_type.clone(), Some(target.id));
    clone.fields = fields;
    Ok(clone)
}

fn effective_mode(descriptor: &RecordDescriptor) -> EffectiveMode {
    if !descriptor.clone_field_overrides.is_empty() {
        if descriptor.clone_mode == CloneMode::Skeleton {
            warn!(
                record_type = %descriptor.record_type,
                "both skeleton mode and clone field overrides declared; overrides win, \
                 skeleton mode is ignored"
            );
        }
        EffectiveMode::FieldOverrides
    } else if descriptor.clone_mode == CloneMode::Skeleton {
        EffectiveMode::Skeleton
    } else {
        EffectiveMode::Full
    }
}

/// Skeleton replacement for one field. `None` means "copy the original
/// value" (required fields keep their data).
fn skeleton_value(field: &FieldDescriptor, is_foreign_key: bool) -> Option<FieldValue> {
    if field.is_required() {
        return None;
    }
    if let Some(default) = &field.default {
        return Some(default.clone());
    }
    if is_foreign_key {
        // Nullable by precheck; fabricating a reference would point at
        // an arbitrary row.
        return Some(FieldValue::Null);
    }
    Some(field.kind.skeleton_default().unwrap_or(FieldValue::Null))
}

/// Excluded fields are written as their declared default or `Null`; a
/// required field with no default would only fail at insert time, so
/// reject the configuration before any row is written.
fn precheck_excluded_fields(descriptor: &RecordDescriptor) -> Result<(), TenancyError> {
    for name in &descriptor.clone_exclude_fields {
        let Some(field) = descriptor.field_descriptor(name) else {
            continue;
        };
        if field.is_required() {
            return Err(TenancyError::InvalidDescriptor {
                record_type: descriptor.record_type.clone(),
                reason: format!(
                    "clone-excluded field '{name}' is required and has no default; \
                     clones would carry a null value"
                ),
            });
        }
    }
    Ok(())
}

/// Configuration errors surface here, before any row is written.
fn precheck_skeleton(descriptor: &RecordDescriptor, row_count: usize) -> Result<(), TenancyError> {
    for fk in &descriptor.foreign_keys {
        let field = descriptor
            .field_descriptor(&fk.field)
            .expect("checked at registration");
        if !fk.nullable && field.default.is_none() {
            return Err(TenancyError::UnsafeSkeletonDefault {
                record_type: descriptor.record_type.clone(),
                field: fk.field.clone(),
                reason: format!(
                    "required foreign key to '{}' has no safe skeleton default",
                    fk.target_type
                ),
            });
        }
    }

    for field in &descriptor.fields {
        if field.unique && !field.is_required() && row_count > 1 {
            return Err(TenancyError::UnsafeSkeletonDefault {
                record_type: descriptor.record_type.clone(),
                field: field.name.clone(),
                reason: format!(
                    "unique field would receive the same blank value for {row_count} rows"
                ),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{FieldDescriptor, FieldKind};

    #[test]
    fn test_effective_mode_default_is_full() {
        let descriptor = RecordDescriptor::new("product", "products");
        assert_eq!(effective_mode(&descriptor), EffectiveMode::Full);
    }

    #[test]
    fn test_overrides_win_over_skeleton() {
        let descriptor = RecordDescriptor::new("product", "products")
            .clone_mode(CloneMode::Skeleton)
            .clone_field_override("is_default", FieldValue::Boolean(false));
        assert_eq!(effective_mode(&descriptor), EffectiveMode::FieldOverrides);
    }

    #[test]
    fn test_skeleton_values() {
        let required = FieldDescriptor::new("name", FieldKind::Text);
        assert_eq!(skeleton_value(&required, false), None);

        let optional_int = FieldDescriptor::new("stock", FieldKind::Integer).nullable();
        assert_eq!(
            skeleton_value(&optional_int, false),
            Some(FieldValue::Integer(0))
        );

        let defaulted = FieldDescriptor::new("status", FieldKind::Text)
            .with_default(FieldValue::Text("draft".into()));
        assert_eq!(
            skeleton_value(&defaulted, false),
            Some(FieldValue::Text("draft".into()))
        );

        let nullable_fk = FieldDescriptor::new("parent_id", FieldKind::Uuid).nullable();
        assert_eq!(skeleton_value(&nullable_fk, true), Some(FieldValue::Null));
    }

    #[test]
    fn test_excluded_required_field_without_default_is_rejected() {
        let descriptor = RecordDescriptor::new("order", "orders")
            .field(FieldDescriptor::new("reference", FieldKind::Text))
            .clone_exclude_field("reference");
        let err = precheck_excluded_fields(&descriptor).unwrap_err();
        assert!(matches!(err, TenancyError::InvalidDescriptor { .. }));

        // Nullable or defaulted fields are fine to exclude.
        let nullable = RecordDescriptor::new("order", "orders")
            .field(FieldDescriptor::new("note", FieldKind::Text).nullable())
            .clone_exclude_field("note");
        assert!(precheck_excluded_fields(&nullable).is_ok());

        let defaulted = RecordDescriptor::new("order", "orders")
            .field(
                FieldDescriptor::new("status", FieldKind::Text)
                    .with_default(FieldValue::Text("draft".into())),
            )
            .clone_exclude_field("status");
        assert!(precheck_excluded_fields(&defaulted).is_ok());
    }

    #[test]
    fn test_skeleton_precheck_rejects_required_fk() {
        let descriptor = RecordDescriptor::new("product", "products")
            .clone_mode(CloneMode::Skeleton)
            .foreign_key("category_id", "category", false);
        let err = precheck_skeleton(&descriptor, 1).unwrap_err();
        assert!(matches!(err, TenancyError::UnsafeSkeletonDefault { .. }));
    }

    #[test]
    fn test_skeleton_precheck_rejects_blanked_unique_field() {
        let descriptor = RecordDescriptor::new("theme", "themes")
            .clone_mode(CloneMode::Skeleton)
            .field(FieldDescriptor::new("slug", FieldKind::Text).nullable().unique());
        assert!(precheck_skeleton(&descriptor, 2).is_err());
        // A single template row cannot collide with itself.
        assert!(precheck_skeleton(&descriptor, 1).is_ok());
    }
}
