//! Provisioning workflow integration tests.

mod support;

use std::sync::Arc;

use support::{tenant, MemoryStore, MemoryTenantRepository};
use tenancy_core::record::{FieldValue, RecordRow};
use tenancy_core::registry::{FieldDescriptor, FieldKind, RecordDescriptor, RecordRegistry};
use tenancy_core::{CloneOptions, NewOwner, NewTenant, TenancyError, TenantProvisioner};

fn registry() -> Arc<RecordRegistry> {
    let mut registry = RecordRegistry::new();
    registry
        .register(
            RecordDescriptor::new("category", "categories")
                .field(FieldDescriptor::new("name", FieldKind::Text)),
        )
        .unwrap();
    registry
        .register(
            RecordDescriptor::new("product", "products")
                .field(FieldDescriptor::new("name", FieldKind::Text))
                .foreign_key("category_id", "category", false),
        )
        .unwrap();
    Arc::new(registry)
}

fn provisioner(store: &MemoryStore) -> TenantProvisioner {
    TenantProvisioner::new(
        Arc::new(MemoryTenantRepository::new(store.clone())),
        Arc::new(store.clone()),
        registry(),
    )
}

fn new_tenant(domain: &str) -> NewTenant {
    NewTenant {
        name: "Acme".to_string(),
        domain: domain.to_string(),
    }
}

fn new_owner() -> NewOwner {
    NewOwner {
        username: "admin".to_string(),
        email: "admin@acme.example.com".to_string(),
        password: "s3cret-passphrase".to_string(),
    }
}

#[tokio::test]
async fn first_tenant_becomes_template_without_cloning() {
    let store = MemoryStore::new();
    let provisioned = provisioner(&store)
        .provision(new_tenant("acme.example.com"), new_owner(), &CloneOptions::default())
        .await
        .unwrap();

    assert_eq!(provisioned.summary.total(), 0);
    assert_eq!(provisioned.owner.tenant_id, provisioned.tenant.id);
    assert!(provisioned.owner.password_hash.starts_with("$argon2"));
    assert_eq!(store.tenants().len(), 1);
    assert_eq!(store.owners().len(), 1);
}

#[tokio::test]
async fn second_tenant_is_seeded_from_the_template() {
    let store = MemoryStore::new();
    let template = tenant("Template", "template.example.com");
    store.seed_tenant(&template);

    let category = RecordRow::new("category", Some(template.id))
        .with_field("name", FieldValue::Text("Default".into()));
    let product = RecordRow::new("product", Some(template.id))
        .with_field("name", FieldValue::Text("Widget".into()))
        .with_field("category_id", FieldValue::Uuid(category.id));
    store.seed_record(category);
    store.seed_record(product);

    let provisioned = provisioner(&store)
        .provision(new_tenant("acme.example.com"), new_owner(), &CloneOptions::default())
        .await
        .unwrap();

    assert_eq!(provisioned.summary.count("category"), 1);
    assert_eq!(provisioned.summary.count("product"), 1);
    assert_eq!(
        store.count_for_tenant("product", provisioned.tenant.id),
        1
    );
}

#[tokio::test]
async fn duplicate_domain_is_rejected() {
    let store = MemoryStore::new();
    store.seed_tenant(&tenant("Acme", "acme.example.com"));

    let err = provisioner(&store)
        .provision(new_tenant("acme.example.com"), new_owner(), &CloneOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TenancyError::TenantDomainAlreadyExists(_)));
}

/// A clone failure mid-run must leave no tenant and no owner behind.
#[tokio::test]
async fn failed_clone_rolls_back_tenant_and_owner() {
    let store = MemoryStore::new();
    let template = tenant("Template", "template.example.com");
    store.seed_tenant(&template);
    store.seed_record(
        RecordRow::new("category", Some(template.id))
            .with_field("name", FieldValue::Text("Default".into())),
    );
    store.fail_on("category");

    let err = provisioner(&store)
        .provision(new_tenant("acme.example.com"), new_owner(), &CloneOptions::default())
        .await
        .unwrap_err();
    // The typed cause stays reachable behind the provisioning error.
    match &err {
        TenancyError::ProvisioningFailed(inner) => {
            assert!(matches!(**inner, TenancyError::CloneFailure { .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // Only the pre-existing template tenant remains; no owner, no rows.
    assert_eq!(store.tenants().len(), 1);
    assert!(store.owners().is_empty());
    assert!(store
        .tenants()
        .iter()
        .all(|t| t.domain == "template.example.com"));
}
