//! Table backend abstraction for pluggable table services.
//!
//! The identity stores never talk to a concrete service. They go through the
//! `TableBackend` trait, which captures the small surface of a managed
//! key-value table service that identity persistence needs:
//! - table administration (list, describe, create, add secondary indexes)
//! - single-item put/get/delete with an optional precondition
//! - query by primary key or secondary index with key equality
//! - full scan with non-key filters
//!
//! ## Pagination
//!
//! `list_tables`, `query` and `scan` return one page at a time. A page that
//! carries a `last_evaluated_*` marker is not the last one; callers feed the
//! marker back as the exclusive start of the next request. Loops that drain
//! every page live in [`EntityTable`](crate::EntityTable) and
//! [`SchemaManager`](crate::SchemaManager).
//!
//! ## Implementations
//!
//! - [`InMemoryTableBackend`](crate::InMemoryTableBackend): process-local, used by tests
//! - `DynamoDbBackend`: Amazon DynamoDB (cargo feature `dynamodb`)
//!
//! ## Implementing a Custom Backend
//!
//! ```rust,ignore
//! use idstore_store::{TableBackend, TableSchema, TableDescription, Result};
//!
//! pub struct MyBackend { /* client handle */ }
//!
//! #[async_trait::async_trait]
//! impl TableBackend for MyBackend {
//!     async fn describe_table(&self, table_name: &str) -> Result<TableDescription> {
//!         todo!()
//!     }
//!     // ... implement the other required methods
//! }
//! ```

use std::any::Any;

use async_trait::async_trait;

use crate::attribute::Item;
use crate::error::Result;
use crate::request::{Condition, ItemPage, QueryRequest, ScanRequest, TableNamePage};
use crate::schema::{SecondaryIndex, TableDescription, TableSchema};

/// Contract every table service adapter fulfils.
#[async_trait]
pub trait TableBackend: Send + Sync {
    /// Lists one page of table names, in ascending order, strictly after
    /// `exclusive_start_table_name`.
    async fn list_tables(
        &self,
        exclusive_start_table_name: Option<&str>,
        limit: Option<usize>,
    ) -> Result<TableNamePage>;

    /// Describes a table and its indexes. `TableNotFound` when absent.
    async fn describe_table(&self, table_name: &str) -> Result<TableDescription>;

    /// Creates a table with its primary key and every declared index in one request.
    ///
    /// `TableAlreadyExists` when the name is taken.
    async fn create_table(&self, schema: &TableSchema) -> Result<TableDescription>;

    /// Adds secondary indexes to an existing table.
    ///
    /// `IndexAlreadyExists` when one of the names is already present.
    async fn update_table(
        &self,
        table_name: &str,
        add_indexes: &[SecondaryIndex],
    ) -> Result<TableDescription>;

    /// Writes (inserts or replaces) a whole item.
    ///
    /// When `condition` does not hold for the currently stored item the write
    /// is rejected with `ConditionalCheckFailed` and nothing changes.
    async fn put_item(&self, table_name: &str, item: Item, condition: Option<Condition>)
        -> Result<()>;

    /// Reads an item by its full primary key.
    async fn get_item(&self, table_name: &str, key: &Item) -> Result<Option<Item>>;

    /// Removes an item by its full primary key. Removing a missing item is not an error
    /// unless a condition is given and fails.
    async fn delete_item(&self, table_name: &str, key: &Item, condition: Option<Condition>)
        -> Result<()>;

    /// Returns one page of items matching the key condition.
    async fn query(&self, request: QueryRequest) -> Result<ItemPage>;

    /// Returns one page of the table, filtered.
    async fn scan(&self, request: ScanRequest) -> Result<ItemPage>;

    /// Returns self as Any for downcasting to a concrete backend.
    fn as_any(&self) -> &dyn Any;
}
