//! Idempotent table and index provisioning.
//!
//! `ensure_initialized` converges a live table onto a [`TableSchema`]:
//!
//! ```text
//! list tables ──absent──> create table (+ all indexes) ──┐
//!      │                        │ TableAlreadyExists     │
//!      │ present                v                        │
//!      └──────────────> describe, add missing indexes ───┤
//!                                                        v
//!                                  poll describe until table + indexes ACTIVE
//! ```
//!
//! Several processes may start at once against the same tables. Losing the
//! create race falls through to the index diff, and losing an index race is
//! logged and ignored. Any other creation failure is fatal.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::error::TableError;
use crate::schema::{SecondaryIndex, TableDescription, TableSchema};
use crate::table_trait::TableBackend;

/// Interval between activation polls unless configured otherwise.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Upper bound on the activation wait unless configured otherwise.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(600);

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to create table '{table}': {source}")]
    TableCreationFailed {
        table: String,
        #[source]
        source: TableError,
    },

    #[error("Table '{table}' did not become active within {waited:?}")]
    ActivationTimeout { table: String, waited: Duration },

    #[error(transparent)]
    Backend(#[from] TableError),
}

/// Converges tables onto their declared schema.
#[derive(Clone)]
pub struct SchemaManager {
    backend: Arc<dyn TableBackend>,
    poll_interval: Duration,
    max_wait: Duration,
}

impl SchemaManager {
    pub fn new(backend: Arc<dyn TableBackend>) -> Self {
        Self {
            backend,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }

    pub fn with_polling(mut self, poll_interval: Duration, max_wait: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.max_wait = max_wait;
        self
    }

    /// Every table name, following `list_tables` pagination.
    pub async fn list_all_tables(&self) -> Result<Vec<String>, TableError> {
        let mut names = Vec::new();
        let mut start: Option<String> = None;
        loop {
            let page = self.backend.list_tables(start.as_deref(), None).await?;
            names.extend(page.table_names);
            match page.last_evaluated_table_name {
                Some(last) => start = Some(last),
                None => break,
            }
        }
        Ok(names)
    }

    /// Makes sure the table exists with every declared index and is active.
    pub async fn ensure_initialized(&self, schema: &TableSchema) -> Result<TableDescription, SchemaError> {
        let table = schema.table_name.as_str();
        let existing = self.list_all_tables().await?;

        if !existing.iter().any(|name| name == table) {
            log::info!(
                "Creating table '{}' with indexes [{}]",
                table,
                schema
                    .indexes
                    .iter()
                    .map(|idx| idx.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            match self.backend.create_table(schema).await {
                Ok(_) => return self.wait_until_active(table).await,
                Err(TableError::TableAlreadyExists(_)) => {
                    log::info!("Table '{}' was created concurrently, reconciling indexes", table);
                }
                Err(source) => {
                    return Err(SchemaError::TableCreationFailed {
                        table: table.to_string(),
                        source,
                    });
                }
            }
        }

        let description = self.backend.describe_table(table).await?;
        if description.key_schema != schema.key_schema {
            log::warn!(
                "Table '{}' primary key {:?} differs from declared {:?}; primary keys cannot be altered",
                table,
                description.key_schema,
                schema.key_schema
            );
        }

        let missing: Vec<&SecondaryIndex> = schema
            .indexes
            .iter()
            .filter(|idx| !description.has_index(&idx.name))
            .collect();

        for index in missing {
            // One index per update; the service rejects a second build while one is in flight.
            self.wait_until_active(table).await?;
            log::info!("Adding index '{}' to table '{}'", index.name, table);
            match self
                .backend
                .update_table(table, std::slice::from_ref(index))
                .await
            {
                Ok(_) => {}
                Err(TableError::IndexAlreadyExists { index, .. }) => {
                    log::warn!("Index '{}' on '{}' already exists, skipping", index, table);
                }
                Err(err) => return Err(err.into()),
            }
        }

        self.wait_until_active(table).await
    }

    /// Polls until the table and all of its indexes report `Active`.
    pub async fn wait_until_active(&self, table: &str) -> Result<TableDescription, SchemaError> {
        let started = Instant::now();
        loop {
            let description = self.backend.describe_table(table).await?;
            if description.is_active() {
                return Ok(description);
            }

            let waited = started.elapsed();
            if waited >= self.max_wait {
                return Err(SchemaError::ActivationTimeout {
                    table: table.to_string(),
                    waited,
                });
            }

            log::debug!(
                "Waiting for table '{}' ({}) and indexes [{}] to become active",
                table,
                description.status,
                description
                    .indexes
                    .iter()
                    .map(|idx| format!("{}={}", idx.name, idx.status))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            tokio::time::sleep(self.poll_interval.min(self.max_wait - waited)).await;
        }
    }
}
