//! # idstore-store
//!
//! Table service abstraction for identity persistence.
//!
//! ## Architecture
//!
//! ```text
//! idstore-identity (user / role / membership stores)
//!     |
//! idstore-store (EntityTable, SchemaManager, TableBackend)
//!     |
//! DynamoDB or in-memory tables
//! ```
//!
//! ## Modules
//!
//! - `table_trait`: the `TableBackend` contract
//! - `attribute`, `schema`, `request`: item model, table declarations, request types
//! - `codec`: serde mapping between records and items
//! - `entity_table`: typed, versioned reads and writes
//! - `schema_manager`: idempotent table/index provisioning and activation wait
//! - `in_memory`: process-local backend
//! - `dynamodb_impl`: Amazon DynamoDB backend (feature `dynamodb`)

pub mod attribute;
pub mod codec;
pub mod entity_table;
pub mod error;
pub mod in_memory;
pub mod request;
pub mod schema;
pub mod schema_manager;
pub mod table_trait;

#[cfg(feature = "dynamodb")]
pub mod dynamodb_impl;

pub use attribute::{string_key, AttributeValue, Item};
pub use entity_table::{EntityTable, TableEntity};
pub use error::{Result, TableError};
pub use in_memory::InMemoryTableBackend;
pub use request::{
    Condition, ItemPage, KeyCondition, QueryRequest, ScanFilter, ScanRequest, TableNamePage,
};
pub use schema::{
    IndexDescription, KeyAttribute, KeySchema, Projection, ProvisionedThroughput, ResourceStatus,
    ScalarType, SecondaryIndex, TableDescription, TableSchema,
};
pub use schema_manager::{SchemaError, SchemaManager};
pub use table_trait::TableBackend;

#[cfg(feature = "dynamodb")]
pub use dynamodb_impl::DynamoDbBackend;
