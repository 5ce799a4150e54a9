//! Shared setup for the identity integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use idstore_configs::TableSettings;
use idstore_identity::{initialize_identity_tables, IdentityRole, IdentityStores, IdentityUser};
use idstore_store::{InMemoryTableBackend, SchemaManager, TableBackend};

/// In-memory backend with the three identity tables provisioned.
pub async fn provisioned_backend(backend: InMemoryTableBackend) -> Arc<InMemoryTableBackend> {
    let backend = Arc::new(backend);
    let manager = SchemaManager::new(backend.clone())
        .with_polling(Duration::from_millis(1), Duration::from_secs(1));
    initialize_identity_tables(&manager, &TableSettings::default())
        .await
        .expect("identity tables should initialize");
    backend
}

/// Stores over a freshly provisioned in-memory backend.
pub async fn setup_stores<U: IdentityUser, R: IdentityRole>(
) -> (Arc<InMemoryTableBackend>, IdentityStores<U, R>) {
    setup_stores_on(InMemoryTableBackend::new()).await
}

pub async fn setup_stores_on<U: IdentityUser, R: IdentityRole>(
    backend: InMemoryTableBackend,
) -> (Arc<InMemoryTableBackend>, IdentityStores<U, R>) {
    let backend = provisioned_backend(backend).await;
    let shared: Arc<dyn TableBackend> = backend.clone();
    let stores = IdentityStores::new(shared, &TableSettings::default());
    (backend, stores)
}
