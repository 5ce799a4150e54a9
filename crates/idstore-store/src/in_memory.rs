//! Process-local table backend.
//!
//! Behaves like the managed service on everything the identity stores rely on:
//! conditional writes, sparse secondary indexes (an item missing an index key
//! attribute is not visible through that index), key-type validation, paged
//! results and asynchronous activation of new tables and indexes.
//!
//! Activation is simulated by counting `describe_table` calls: a table or index
//! created while `activation_polls` is N reports `Creating` for the next N
//! describes. Tests use this to exercise the schema manager's wait loop.

use std::any::Any;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Bound;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::attribute::{compare_key_values, AttributeValue, Item};
use crate::error::{Result, TableError};
use crate::request::{Condition, ItemPage, QueryRequest, ScanRequest, TableNamePage};
use crate::schema::{
    IndexDescription, KeySchema, ResourceStatus, SecondaryIndex, TableDescription, TableSchema,
};
use crate::table_trait::TableBackend;

/// Items (or table names) returned per page unless a request asks for fewer.
pub const DEFAULT_PAGE_SIZE: usize = 100;

const KEY_SEPARATOR: &str = "\u{1f}";

struct MemIndex {
    definition: SecondaryIndex,
    pending_polls: u32,
}

struct MemTable {
    schema: TableSchema,
    indexes: Vec<MemIndex>,
    pending_polls: u32,
    pending_status: ResourceStatus,
    /// Encoded primary key -> item
    items: BTreeMap<String, Item>,
}

impl MemTable {
    /// Describes the table; when `tick` is set, one activation poll is consumed.
    fn describe(&mut self, tick: bool) -> TableDescription {
        let status = if poll(&mut self.pending_polls, tick) {
            self.pending_status
        } else {
            ResourceStatus::Active
        };

        let indexes = self
            .indexes
            .iter_mut()
            .map(|idx| IndexDescription {
                name: idx.definition.name.clone(),
                key_schema: idx.definition.key_schema.clone(),
                status: if poll(&mut idx.pending_polls, tick) {
                    ResourceStatus::Creating
                } else {
                    ResourceStatus::Active
                },
            })
            .collect();

        TableDescription {
            table_name: self.schema.table_name.clone(),
            key_schema: self.schema.key_schema.clone(),
            status,
            indexes,
            item_count: self.items.len() as u64,
        }
    }

    fn index_key_schema(&self, name: &str) -> Result<&KeySchema> {
        self.indexes
            .iter()
            .find(|idx| idx.definition.name == name)
            .map(|idx| &idx.definition.key_schema)
            .ok_or_else(|| {
                TableError::Validation(format!(
                    "The table '{}' does not have the specified index: {}",
                    self.schema.table_name, name
                ))
            })
    }

    fn validate_index_attributes(&self, item: &Item) -> Result<()> {
        for idx in &self.indexes {
            for attr in idx.definition.key_schema.attributes() {
                if let Some(value) = item.get(&attr.name) {
                    if !attr.scalar_type.accepts(value) {
                        return Err(TableError::Validation(format!(
                            "Type mismatch for index key '{}' of index '{}': expected {}, got {}",
                            attr.name,
                            idx.definition.name,
                            attr.scalar_type.type_name(),
                            value.type_name()
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Returns whether the resource is still pending, consuming a poll when `tick` is set.
fn poll(pending: &mut u32, tick: bool) -> bool {
    if *pending == 0 {
        return false;
    }
    if tick && *pending != u32::MAX {
        *pending -= 1;
    }
    true
}

fn key_component(value: &AttributeValue) -> String {
    match value {
        AttributeValue::S(s) | AttributeValue::N(s) => s.clone(),
        other => format!("{:?}", other),
    }
}

fn encode_primary_key(key_schema: &KeySchema, item: &Item) -> Result<String> {
    let mut parts = Vec::with_capacity(2);
    for attr in key_schema.attributes() {
        let value = item.get(&attr.name).ok_or_else(|| {
            TableError::Validation(format!("Missing the key {} in the item", attr.name))
        })?;
        if !attr.scalar_type.accepts(value) {
            return Err(TableError::Validation(format!(
                "Type mismatch for key {}: expected {}, got {}",
                attr.name,
                attr.scalar_type.type_name(),
                value.type_name()
            )));
        }
        parts.push(key_component(value));
    }
    Ok(parts.join(KEY_SEPARATOR))
}

fn extract_key(item: &Item, schemas: &[&KeySchema]) -> Item {
    let mut key = Item::new();
    for schema in schemas {
        for attr in schema.attributes() {
            if let Some(value) = item.get(&attr.name) {
                key.insert(attr.name.clone(), value.clone());
            }
        }
    }
    key
}

fn validate_table_name(name: &str) -> Result<()> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
    if name.len() < 3 || name.len() > 255 || !valid_chars {
        return Err(TableError::Validation(format!(
            "Invalid table or index name '{}': must be 3-255 characters of [a-zA-Z0-9_.-]",
            name
        )));
    }
    Ok(())
}

/// In-memory implementation of [`TableBackend`].
pub struct InMemoryTableBackend {
    tables: RwLock<BTreeMap<String, MemTable>>,
    page_size: usize,
    activation_polls: u32,
}

impl InMemoryTableBackend {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(BTreeMap::new()),
            page_size: DEFAULT_PAGE_SIZE,
            activation_polls: 0,
        }
    }

    /// Caps every page at `page_size` entries (minimum 1).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// New tables and indexes report `Creating` for the next `polls` describes.
    /// `u32::MAX` keeps them pending forever.
    pub fn with_activation_polls(mut self, polls: u32) -> Self {
        self.activation_polls = polls;
        self
    }

    /// Number of items physically stored, deleted markers included.
    pub fn item_count(&self, table_name: &str) -> usize {
        self.tables
            .read()
            .get(table_name)
            .map_or(0, |table| table.items.len())
    }

    fn page_limit(&self, requested: Option<usize>) -> Result<usize> {
        match requested {
            Some(0) => Err(TableError::Validation(
                "Limit must be greater than or equal to 1".to_string(),
            )),
            Some(n) => Ok(n.min(self.page_size)),
            None => Ok(self.page_size),
        }
    }
}

impl Default for InMemoryTableBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TableBackend for InMemoryTableBackend {
    async fn list_tables(
        &self,
        exclusive_start_table_name: Option<&str>,
        limit: Option<usize>,
    ) -> Result<TableNamePage> {
        let take = self.page_limit(limit)?;
        let tables = self.tables.read();
        let lower = match exclusive_start_table_name {
            Some(start) => Bound::Excluded(start.to_string()),
            None => Bound::Unbounded,
        };

        let mut names = tables.range((lower, Bound::Unbounded)).map(|(name, _)| name.clone());
        let table_names: Vec<String> = names.by_ref().take(take).collect();
        let more = names.next().is_some();

        Ok(TableNamePage {
            last_evaluated_table_name: if more { table_names.last().cloned() } else { None },
            table_names,
        })
    }

    async fn describe_table(&self, table_name: &str) -> Result<TableDescription> {
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(table_name)
            .ok_or_else(|| TableError::TableNotFound(table_name.to_string()))?;
        Ok(table.describe(true))
    }

    async fn create_table(&self, schema: &TableSchema) -> Result<TableDescription> {
        validate_table_name(&schema.table_name)?;
        for (pos, index) in schema.indexes.iter().enumerate() {
            validate_table_name(&index.name)?;
            if schema.indexes[..pos].iter().any(|other| other.name == index.name) {
                return Err(TableError::Validation(format!(
                    "Duplicate index name: {}",
                    index.name
                )));
            }
        }

        let mut tables = self.tables.write();
        if tables.contains_key(&schema.table_name) {
            return Err(TableError::TableAlreadyExists(schema.table_name.clone()));
        }

        let mut table = MemTable {
            schema: TableSchema {
                indexes: Vec::new(),
                ..schema.clone()
            },
            indexes: schema
                .indexes
                .iter()
                .map(|definition| MemIndex {
                    definition: definition.clone(),
                    pending_polls: self.activation_polls,
                })
                .collect(),
            pending_polls: self.activation_polls,
            pending_status: ResourceStatus::Creating,
            items: BTreeMap::new(),
        };
        let description = table.describe(false);
        tables.insert(schema.table_name.clone(), table);

        log::debug!(
            "in-memory table '{}' created with {} index(es)",
            schema.table_name,
            schema.indexes.len()
        );
        Ok(description)
    }

    async fn update_table(
        &self,
        table_name: &str,
        add_indexes: &[SecondaryIndex],
    ) -> Result<TableDescription> {
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(table_name)
            .ok_or_else(|| TableError::TableNotFound(table_name.to_string()))?;

        for index in add_indexes {
            validate_table_name(&index.name)?;
            if table.indexes.iter().any(|idx| idx.definition.name == index.name) {
                return Err(TableError::IndexAlreadyExists {
                    table: table_name.to_string(),
                    index: index.name.clone(),
                });
            }
        }

        for index in add_indexes {
            table.indexes.push(MemIndex {
                definition: index.clone(),
                pending_polls: self.activation_polls,
            });
        }
        table.pending_polls = self.activation_polls;
        table.pending_status = ResourceStatus::Updating;

        Ok(table.describe(false))
    }

    async fn put_item(
        &self,
        table_name: &str,
        item: Item,
        condition: Option<Condition>,
    ) -> Result<()> {
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(table_name)
            .ok_or_else(|| TableError::TableNotFound(table_name.to_string()))?;

        let pk = encode_primary_key(&table.schema.key_schema, &item)?;
        table.validate_index_attributes(&item)?;

        if let Some(condition) = condition {
            if !condition.evaluate(table.items.get(&pk)) {
                return Err(TableError::ConditionalCheckFailed {
                    table: table_name.to_string(),
                    condition: condition.to_string(),
                });
            }
        }

        table.items.insert(pk, item);
        Ok(())
    }

    async fn get_item(&self, table_name: &str, key: &Item) -> Result<Option<Item>> {
        let tables = self.tables.read();
        let table = tables
            .get(table_name)
            .ok_or_else(|| TableError::TableNotFound(table_name.to_string()))?;
        let pk = encode_primary_key(&table.schema.key_schema, key)?;
        Ok(table.items.get(&pk).cloned())
    }

    async fn delete_item(
        &self,
        table_name: &str,
        key: &Item,
        condition: Option<Condition>,
    ) -> Result<()> {
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(table_name)
            .ok_or_else(|| TableError::TableNotFound(table_name.to_string()))?;
        let pk = encode_primary_key(&table.schema.key_schema, key)?;

        if let Some(condition) = condition {
            if !condition.evaluate(table.items.get(&pk)) {
                return Err(TableError::ConditionalCheckFailed {
                    table: table_name.to_string(),
                    condition: condition.to_string(),
                });
            }
        }

        table.items.remove(&pk);
        Ok(())
    }

    async fn query(&self, request: QueryRequest) -> Result<ItemPage> {
        let take = self.page_limit(request.limit)?;
        let tables = self.tables.read();
        let table = tables
            .get(&request.table_name)
            .ok_or_else(|| TableError::TableNotFound(request.table_name.clone()))?;

        let primary = &table.schema.key_schema;
        let key_schema = match &request.index_name {
            Some(name) => table.index_key_schema(name)?,
            None => primary,
        };

        let condition = &request.key_condition;
        if condition.hash_attribute != key_schema.hash.name {
            return Err(TableError::Validation(format!(
                "Query key condition must use hash key '{}', got '{}'",
                key_schema.hash.name, condition.hash_attribute
            )));
        }
        if let Some((attr, _)) = &condition.range {
            if key_schema.range.as_ref().map(|r| &r.name) != Some(attr) {
                return Err(TableError::Validation(format!(
                    "Query key condition references '{}', which is not the range key",
                    attr
                )));
            }
        }

        let range_name = key_schema.range.as_ref().map(|r| r.name.as_str());
        let sort_order = |a: (Option<&AttributeValue>, &str), b: (Option<&AttributeValue>, &str)| {
            compare_key_values(a.0, b.0).then_with(|| a.1.cmp(b.1))
        };

        let mut matches: Vec<(&String, &Item)> = table
            .items
            .iter()
            .filter(|(_, item)| range_name.map_or(true, |r| item.contains_key(r)))
            .filter(|(_, item)| condition.matches(item))
            .collect();
        matches.sort_by(|(pk_a, a), (pk_b, b)| {
            sort_order(
                (range_name.and_then(|r| a.get(r)), pk_a.as_str()),
                (range_name.and_then(|r| b.get(r)), pk_b.as_str()),
            )
        });

        let start_idx = match &request.exclusive_start_key {
            Some(start) => {
                let start_pk = encode_primary_key(primary, start)?;
                let start_range = range_name.and_then(|r| start.get(r));
                matches
                    .iter()
                    .position(|(pk, item)| {
                        sort_order(
                            (range_name.and_then(|r| item.get(r)), pk.as_str()),
                            (start_range, start_pk.as_str()),
                        ) == Ordering::Greater
                    })
                    .unwrap_or(matches.len())
            }
            None => 0,
        };

        let remaining = &matches[start_idx..];
        let items: Vec<Item> = remaining
            .iter()
            .take(take)
            .map(|(_, item)| (*item).clone())
            .collect();
        let last_evaluated_key = if remaining.len() > items.len() {
            items.last().map(|item| extract_key(item, &[primary, key_schema]))
        } else {
            None
        };

        Ok(ItemPage {
            items,
            last_evaluated_key,
        })
    }

    async fn scan(&self, request: ScanRequest) -> Result<ItemPage> {
        let take = self.page_limit(request.limit)?;
        let tables = self.tables.read();
        let table = tables
            .get(&request.table_name)
            .ok_or_else(|| TableError::TableNotFound(request.table_name.clone()))?;
        let primary = &table.schema.key_schema;

        let lower = match &request.exclusive_start_key {
            Some(start) => Bound::Excluded(encode_primary_key(primary, start)?),
            None => Bound::Unbounded,
        };

        let mut iter = table.items.range((lower, Bound::Unbounded));
        let evaluated: Vec<&Item> = iter.by_ref().take(take).map(|(_, item)| item).collect();
        let more = iter.next().is_some();

        let last_evaluated_key = if more {
            evaluated.last().map(|item| extract_key(item, &[primary]))
        } else {
            None
        };
        let items = evaluated
            .into_iter()
            .filter(|item| request.accepts(item))
            .cloned()
            .collect();

        Ok(ItemPage {
            items,
            last_evaluated_key,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::string_key;
    use crate::request::{KeyCondition, ScanFilter};
    use crate::schema::KeyAttribute;

    fn people_schema() -> TableSchema {
        TableSchema::new("people", KeySchema::hash(KeyAttribute::string("Id"))).with_index(
            SecondaryIndex::new(
                "City-Name-index",
                KeySchema::hash_and_range(KeyAttribute::string("City"), KeyAttribute::string("Name")),
            ),
        )
    }

    fn person(id: &str, name: &str, city: Option<&str>) -> Item {
        let mut item = string_key("Id", id);
        item.insert("Name".into(), name.into());
        if let Some(city) = city {
            item.insert("City".into(), city.into());
        }
        item
    }

    #[tokio::test]
    async fn test_create_twice_reports_already_exists() {
        let backend = InMemoryTableBackend::new();
        backend.create_table(&people_schema()).await.unwrap();
        let err = backend.create_table(&people_schema()).await.unwrap_err();
        assert_eq!(err, TableError::TableAlreadyExists("people".into()));
    }

    #[tokio::test]
    async fn test_activation_polls() {
        let backend = InMemoryTableBackend::new().with_activation_polls(2);
        let created = backend.create_table(&people_schema()).await.unwrap();
        assert_eq!(created.status, ResourceStatus::Creating);

        assert!(!backend.describe_table("people").await.unwrap().is_active());
        assert!(!backend.describe_table("people").await.unwrap().is_active());
        assert!(backend.describe_table("people").await.unwrap().is_active());
    }

    #[tokio::test]
    async fn test_index_is_sparse() {
        let backend = InMemoryTableBackend::new();
        backend.create_table(&people_schema()).await.unwrap();
        backend.put_item("people", person("1", "ann", Some("Oslo")), None).await.unwrap();
        backend.put_item("people", person("2", "bob", None), None).await.unwrap();

        let page = backend
            .query(
                QueryRequest::new("people", KeyCondition::hash("City", "Oslo"))
                    .on_index("City-Name-index"),
            )
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].get("Name"), Some(&AttributeValue::from("ann")));
    }

    #[tokio::test]
    async fn test_index_key_type_is_validated() {
        let backend = InMemoryTableBackend::new();
        backend.create_table(&people_schema()).await.unwrap();
        let mut item = person("1", "ann", None);
        item.insert("City".into(), AttributeValue::Null);

        let err = backend.put_item("people", item, None).await.unwrap_err();
        assert!(matches!(err, TableError::Validation(_)));
    }

    #[tokio::test]
    async fn test_conditional_put() {
        let backend = InMemoryTableBackend::new();
        backend.create_table(&people_schema()).await.unwrap();
        let cond = Some(Condition::AttributeNotExists("Id".into()));
        backend.put_item("people", person("1", "ann", None), cond.clone()).await.unwrap();

        let err = backend
            .put_item("people", person("1", "other", None), cond)
            .await
            .unwrap_err();
        assert!(err.is_conditional_check_failed());
        let stored = backend.get_item("people", &string_key("Id", "1")).await.unwrap().unwrap();
        assert_eq!(stored.get("Name"), Some(&AttributeValue::from("ann")));
    }

    #[tokio::test]
    async fn test_query_pages_in_range_order() {
        let backend = InMemoryTableBackend::new().with_page_size(2);
        backend.create_table(&people_schema()).await.unwrap();
        for (id, name) in [("1", "dora"), ("2", "ann"), ("3", "cid"), ("4", "bea"), ("5", "eve")] {
            backend.put_item("people", person(id, name, Some("Rome")), None).await.unwrap();
        }

        let mut names = Vec::new();
        let mut start = None;
        let mut pages = 0;
        loop {
            let page = backend
                .query(
                    QueryRequest::new("people", KeyCondition::hash("City", "Rome"))
                        .on_index("City-Name-index")
                        .starting_after(start),
                )
                .await
                .unwrap();
            pages += 1;
            names.extend(page.items.iter().filter_map(|i| i.get("Name").and_then(|v| v.as_s()).map(String::from)));
            start = page.last_evaluated_key;
            if start.is_none() {
                break;
            }
        }

        assert_eq!(pages, 3);
        assert_eq!(names, vec!["ann", "bea", "cid", "dora", "eve"]);
    }

    #[tokio::test]
    async fn test_scan_filters_after_paging() {
        let backend = InMemoryTableBackend::new().with_page_size(1);
        backend.create_table(&people_schema()).await.unwrap();
        backend.put_item("people", person("1", "ann", Some("Oslo")), None).await.unwrap();
        backend.put_item("people", person("2", "bob", Some("Rome")), None).await.unwrap();

        let first = backend
            .scan(ScanRequest::new("people").with_filter(ScanFilter::equals("City", "Rome")))
            .await
            .unwrap();
        assert!(first.items.is_empty());
        assert!(first.last_evaluated_key.is_some());

        let second = backend
            .scan(
                ScanRequest::new("people")
                    .with_filter(ScanFilter::equals("City", "Rome"))
                    .starting_after(first.last_evaluated_key),
            )
            .await
            .unwrap();
        assert_eq!(second.items.len(), 1);
        assert!(second.last_evaluated_key.is_none());
    }

    #[tokio::test]
    async fn test_update_table_rejects_existing_index() {
        let backend = InMemoryTableBackend::new();
        backend.create_table(&people_schema()).await.unwrap();
        let err = backend
            .update_table("people", &people_schema().indexes)
            .await
            .unwrap_err();
        assert!(matches!(err, TableError::IndexAlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_list_tables_paginates() {
        let backend = InMemoryTableBackend::new().with_page_size(2);
        for name in ["aaa", "bbb", "ccc"] {
            let schema = TableSchema::new(name, KeySchema::hash(KeyAttribute::string("Id")));
            backend.create_table(&schema).await.unwrap();
        }

        let first = backend.list_tables(None, None).await.unwrap();
        assert_eq!(first.table_names, vec!["aaa", "bbb"]);
        assert_eq!(first.last_evaluated_table_name.as_deref(), Some("bbb"));

        let second = backend.list_tables(Some("bbb"), None).await.unwrap();
        assert_eq!(second.table_names, vec!["ccc"]);
        assert!(second.last_evaluated_table_name.is_none());
    }
}
