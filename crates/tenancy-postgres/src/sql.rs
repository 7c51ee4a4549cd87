//! SQL generation from record descriptors.
//!
//! Identifiers are validated at registry registration time, which makes
//! direct interpolation here safe; values always go through binds.

use tenancy_core::registry::RecordDescriptor;

fn column_list(descriptor: &RecordDescriptor) -> String {
    let mut columns = vec!["id".to_string(), descriptor.tenant_column.clone()];
    columns.extend(descriptor.fields.iter().map(|f| f.name.clone()));
    columns.join(", ")
}

pub fn select_sql(descriptor: &RecordDescriptor, with_tenant_filter: bool) -> String {
    let mut sql = format!(
        "SELECT {} FROM {}",
        column_list(descriptor),
        descriptor.table
    );
    if with_tenant_filter {
        sql.push_str(&format!(" WHERE {} = $1", descriptor.tenant_column));
    }
    sql
}

pub fn insert_sql(descriptor: &RecordDescriptor) -> String {
    let placeholders: Vec<String> = (1..=descriptor.fields.len() + 2)
        .map(|i| format!("${i}"))
        .collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        descriptor.table,
        column_list(descriptor),
        placeholders.join(", ")
    )
}
