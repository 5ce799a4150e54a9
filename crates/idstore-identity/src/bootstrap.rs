//! Startup wiring: table provisioning and store construction.
//!
//! Runs once per process before any store is used. There is no global
//! init-once guard; the embedding application owns the startup phase.

use std::sync::Arc;
use std::time::Duration;

use idstore_configs::{SchemaSettings, TableSettings};
use idstore_store::{ProvisionedThroughput, SchemaManager, TableBackend, TableDescription};

use crate::error::Result;
use crate::providers::role_memberships::{role_memberships_table_schema, RoleMembershipsStore};
use crate::providers::roles::models::{IdentityRole, Role};
use crate::providers::roles::{roles_table_schema, RolesStore};
use crate::providers::users::models::{IdentityUser, User};
use crate::providers::users::{users_table_schema, UsersStore};

/// Schema manager with the configured polling bounds.
pub fn schema_manager(backend: Arc<dyn TableBackend>, settings: &SchemaSettings) -> SchemaManager {
    SchemaManager::new(backend).with_polling(
        Duration::from_millis(settings.poll_interval_ms),
        Duration::from_millis(settings.max_wait_ms),
    )
}

pub fn provisioned_throughput(settings: &SchemaSettings) -> ProvisionedThroughput {
    ProvisionedThroughput {
        read_capacity_units: settings.read_capacity_units,
        write_capacity_units: settings.write_capacity_units,
    }
}

/// Creates (or completes) the users, roles and membership tables with the
/// default throughput.
pub async fn initialize_identity_tables(
    manager: &SchemaManager,
    tables: &TableSettings,
) -> Result<Vec<TableDescription>> {
    initialize_identity_tables_with(manager, tables, ProvisionedThroughput::default()).await
}

/// Same as [`initialize_identity_tables`] with explicit capacity units.
///
/// Tables are handled one after the other; each must be active before the
/// next one starts.
pub async fn initialize_identity_tables_with(
    manager: &SchemaManager,
    tables: &TableSettings,
    throughput: ProvisionedThroughput,
) -> Result<Vec<TableDescription>> {
    let schemas = [
        users_table_schema(&tables.users, throughput),
        roles_table_schema(&tables.roles, throughput),
        role_memberships_table_schema(&tables.role_memberships, throughput),
    ];

    let mut descriptions = Vec::with_capacity(schemas.len());
    for schema in &schemas {
        let description = manager.ensure_initialized(schema).await?;
        log::info!(
            "Identity table '{}' ready ({} indexes)",
            description.table_name,
            description.indexes.len()
        );
        descriptions.push(description);
    }
    Ok(descriptions)
}

/// The three stores over one backend.
pub struct IdentityStores<U: IdentityUser = User, R: IdentityRole = Role> {
    pub users: UsersStore<U>,
    pub roles: RolesStore<R>,
    pub memberships: RoleMembershipsStore,
}

impl<U: IdentityUser, R: IdentityRole> IdentityStores<U, R> {
    pub fn new(backend: Arc<dyn TableBackend>, tables: &TableSettings) -> Self {
        let memberships = RoleMembershipsStore::new(backend.clone(), tables.role_memberships.clone());
        Self {
            users: UsersStore::new(backend.clone(), tables.users.clone(), memberships.clone()),
            roles: RolesStore::new(backend, tables.roles.clone()),
            memberships,
        }
    }
}
