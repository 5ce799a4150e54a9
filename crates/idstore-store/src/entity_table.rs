//! Typed, versioned access to one table.
//!
//! ## Architecture
//!
//! ```text
//! EntityTable<E>           <- typed records, optimistic versioning, page draining (this file)
//!     |
//! TableBackend             <- item-level operations (table_trait.rs)
//!     |
//! DynamoDB / in-memory     <- actual table service
//! ```
//!
//! ## Versioning
//!
//! Every save is conditional on the `VersionNumber` attribute:
//!
//! | entity version | write condition                     | stored version |
//! |----------------|-------------------------------------|----------------|
//! | `None`         | `attribute_not_exists(VersionNumber)` | `0`          |
//! | `Some(v)`      | `VersionNumber = v`                 | `v + 1`        |
//!
//! A writer holding a stale copy gets `ConditionalCheckFailed` and nothing is
//! overwritten. The in-memory version is bumped only after the write lands.

use std::marker::PhantomData;
use std::sync::Arc;

use idstore_commons::constants::VERSION_ATTRIBUTE;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::attribute::{AttributeValue, Item};
use crate::codec::{from_item, to_item};
use crate::error::Result;
use crate::request::{Condition, KeyCondition, QueryRequest, ScanFilter, ScanRequest};
use crate::table_trait::TableBackend;

/// A record persisted in an [`EntityTable`].
pub trait TableEntity: Serialize + DeserializeOwned + Send + Sync {
    /// Primary key attributes of this record.
    fn primary_key(&self) -> Item;

    /// Version last read from or written to the table; `None` before the first save.
    fn version(&self) -> Option<i64>;

    fn set_version(&mut self, version: Option<i64>);
}

/// Versioned entity access over a single table.
pub struct EntityTable<E> {
    backend: Arc<dyn TableBackend>,
    table_name: String,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for EntityTable<E> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            table_name: self.table_name.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E> std::fmt::Debug for EntityTable<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityTable")
            .field("table_name", &self.table_name)
            .finish()
    }
}

impl<E: TableEntity> EntityTable<E> {
    pub fn new(backend: Arc<dyn TableBackend>, table_name: impl Into<String>) -> Self {
        Self {
            backend,
            table_name: table_name.into(),
            _entity: PhantomData,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn backend(&self) -> &Arc<dyn TableBackend> {
        &self.backend
    }

    /// Inserts or replaces the record, guarded by its version.
    pub async fn save(&self, entity: &mut E) -> Result<()> {
        let mut item = to_item(&*entity)?;
        let (condition, next_version) = match entity.version() {
            None => (Condition::AttributeNotExists(VERSION_ATTRIBUTE.to_string()), 0),
            Some(current) => (
                Condition::AttributeEquals(
                    VERSION_ATTRIBUTE.to_string(),
                    AttributeValue::number(current),
                ),
                current + 1,
            ),
        };
        item.insert(VERSION_ATTRIBUTE.to_string(), AttributeValue::number(next_version));

        self.backend
            .put_item(&self.table_name, item, Some(condition))
            .await?;
        entity.set_version(Some(next_version));
        Ok(())
    }

    /// Point read by primary key.
    pub async fn load(&self, key: &Item) -> Result<Option<E>> {
        match self.backend.get_item(&self.table_name, key).await? {
            Some(item) => Ok(Some(from_item(&item)?)),
            None => Ok(None),
        }
    }

    /// Physically removes the record, guarded by its version when it has one.
    pub async fn delete(&self, entity: &E) -> Result<()> {
        let condition = entity.version().map(|current| {
            Condition::AttributeEquals(VERSION_ATTRIBUTE.to_string(), AttributeValue::number(current))
        });
        self.backend
            .delete_item(&self.table_name, &entity.primary_key(), condition)
            .await
    }

    /// First record matching the key condition on `index`, reading a single item.
    pub async fn query_first(&self, index: &str, key_condition: KeyCondition) -> Result<Option<E>> {
        let request = QueryRequest::new(self.table_name.clone(), key_condition)
            .on_index(index)
            .with_limit(1);
        let page = self.backend.query(request).await?;
        match page.items.first() {
            Some(item) => Ok(Some(from_item(item)?)),
            None => Ok(None),
        }
    }

    /// Every record matching the key condition on `index`, following pagination.
    pub async fn query_all(&self, index: &str, key_condition: KeyCondition) -> Result<Vec<E>> {
        let mut records = Vec::new();
        let mut start_key = None;
        loop {
            let request = QueryRequest::new(self.table_name.clone(), key_condition.clone())
                .on_index(index)
                .starting_after(start_key);
            let page = self.backend.query(request).await?;
            for item in &page.items {
                records.push(from_item(item)?);
            }
            match page.last_evaluated_key {
                Some(key) => start_key = Some(key),
                None => break,
            }
        }
        Ok(records)
    }

    /// Full scan with filters, following pagination. Cost grows with table size.
    pub async fn scan_all(&self, filters: Vec<ScanFilter>) -> Result<Vec<E>> {
        let mut records = Vec::new();
        let mut start_key = None;
        loop {
            let mut request = ScanRequest::new(self.table_name.clone()).starting_after(start_key);
            request.filters = filters.clone();
            let page = self.backend.scan(request).await?;
            for item in &page.items {
                records.push(from_item(item)?);
            }
            match page.last_evaluated_key {
                Some(key) => start_key = Some(key),
                None => break,
            }
        }
        log::trace!(
            "scan of '{}' matched {} record(s)",
            self.table_name,
            records.len()
        );
        Ok(records)
    }
}
