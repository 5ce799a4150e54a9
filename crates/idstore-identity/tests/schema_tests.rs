//! Integration tests for identity table provisioning

use std::sync::Arc;
use std::time::Duration;

use idstore_configs::TableSettings;
use idstore_identity::providers::users::{create_users_indexes, users_table_schema, USERS_BY_EMAIL_INDEX};
use idstore_identity::{initialize_identity_tables, IdentityError};
use idstore_store::{
    InMemoryTableBackend, KeyAttribute, KeySchema, ProvisionedThroughput, SchemaError, SchemaManager,
    TableBackend, TableSchema,
};

fn fast_manager(backend: Arc<InMemoryTableBackend>) -> SchemaManager {
    SchemaManager::new(backend).with_polling(Duration::from_millis(1), Duration::from_secs(2))
}

#[tokio::test]
async fn test_initialize_twice_keeps_declared_indexes() {
    let backend = Arc::new(InMemoryTableBackend::new());
    let manager = fast_manager(backend.clone());
    let tables = TableSettings::default();

    initialize_identity_tables(&manager, &tables).await.unwrap();
    initialize_identity_tables(&manager, &tables).await.unwrap();

    let users = backend.describe_table("users").await.unwrap();
    let mut names = users.index_names();
    names.sort();
    assert_eq!(
        names,
        vec!["NormalizedEmail-DeletedOn-index", "NormalizedUserName-DeletedOn-index"]
    );

    let roles = backend.describe_table("roles").await.unwrap();
    assert_eq!(roles.index_names(), vec!["NormalizedName-DeletedOn-index"]);

    let memberships = backend.describe_table("roleUsers").await.unwrap();
    assert_eq!(memberships.indexes.len(), 2);
}

#[tokio::test]
async fn test_missing_index_is_added_to_existing_table() {
    let backend = Arc::new(InMemoryTableBackend::new().with_activation_polls(2));
    let bare = TableSchema::new("users", KeySchema::hash(KeyAttribute::string("Id")));
    backend.create_table(&bare).await.unwrap();

    let manager = fast_manager(backend.clone());
    let description = manager
        .ensure_initialized(&users_table_schema("users", ProvisionedThroughput::default()))
        .await
        .unwrap();

    assert!(description.is_active());
    assert!(description.has_index(USERS_BY_EMAIL_INDEX));
    assert_eq!(description.indexes.len(), create_users_indexes().len());
}

#[tokio::test]
async fn test_custom_table_names() {
    let backend = Arc::new(InMemoryTableBackend::new());
    let manager = fast_manager(backend.clone());
    let tables = TableSettings {
        users: "app_users".to_string(),
        roles: "app_roles".to_string(),
        role_memberships: "app_role_users".to_string(),
    };

    initialize_identity_tables(&manager, &tables).await.unwrap();

    let mut names = manager.list_all_tables().await.unwrap();
    names.sort();
    assert_eq!(names, vec!["app_role_users", "app_roles", "app_users"]);
}

#[tokio::test]
async fn test_activation_wait_is_bounded() {
    let backend = Arc::new(InMemoryTableBackend::new().with_activation_polls(u32::MAX));
    let manager = SchemaManager::new(backend)
        .with_polling(Duration::from_millis(1), Duration::from_millis(20));

    let err = initialize_identity_tables(&manager, &TableSettings::default())
        .await
        .unwrap_err();
    match err {
        IdentityError::Schema(SchemaError::ActivationTimeout { table, waited }) => {
            assert_eq!(table, "users");
            assert!(waited >= Duration::from_millis(20));
        }
        other => panic!("expected an activation timeout, got {other:?}"),
    }
}
