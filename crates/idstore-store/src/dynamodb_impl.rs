//! Amazon DynamoDB implementation of [`TableBackend`].
//!
//! Requests map one-to-one onto the service API. Two details are worth knowing:
//! - `ScanFilter::Equals` is pushed down as a `FilterExpression`; list-element
//!   matches have no expression form and are applied to each returned page.
//! - Error codes are translated into [`TableError`] variants; anything
//!   unrecognised is surfaced as `Backend` with the SDK's full error context.

use std::any::Any;
use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::error::{BuildError, DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue as DdbValue, CreateGlobalSecondaryIndexAction,
    GlobalSecondaryIndex, GlobalSecondaryIndexUpdate, IndexStatus, KeySchemaElement, KeyType,
    Projection as DdbProjection, ProjectionType, ProvisionedThroughput as DdbThroughput,
    ScalarAttributeType, TableDescription as DdbTableDescription, TableStatus,
};
use aws_sdk_dynamodb::Client;

use crate::attribute::{AttributeValue, Item};
use crate::error::{Result, TableError};
use crate::request::{Condition, ItemPage, QueryRequest, ScanFilter, ScanRequest, TableNamePage};
use crate::schema::{
    IndexDescription, KeyAttribute, KeySchema, Projection, ProvisionedThroughput, ResourceStatus,
    ScalarType, SecondaryIndex, TableDescription, TableSchema,
};
use crate::table_trait::TableBackend;

type DdbItem = HashMap<String, DdbValue>;

/// DynamoDB-backed tables.
#[derive(Clone, Debug)]
pub struct DynamoDbBackend {
    client: Client,
}

impl DynamoDbBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client from the default credential chain, with an explicit
    /// region and an optional endpoint (local DynamoDB, LocalStack).
    pub async fn connect(region: &str, endpoint_url: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.to_string()));
        if let Some(url) = endpoint_url {
            loader = loader.endpoint_url(url);
        }
        let config = loader.load().await;
        log::debug!(
            "DynamoDB client configured: region={}, endpoint={}",
            region,
            endpoint_url.unwrap_or("<default>")
        );
        Self::new(Client::new(&config))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

// ----------------------------------------------------------------------------
// Value conversion
// ----------------------------------------------------------------------------

fn to_ddb(value: &AttributeValue) -> DdbValue {
    match value {
        AttributeValue::S(s) => DdbValue::S(s.clone()),
        AttributeValue::N(n) => DdbValue::N(n.clone()),
        AttributeValue::Bool(b) => DdbValue::Bool(*b),
        AttributeValue::Null => DdbValue::Null(true),
        AttributeValue::L(values) => DdbValue::L(values.iter().map(to_ddb).collect()),
        AttributeValue::M(map) => DdbValue::M(to_ddb_item(map)),
    }
}

fn to_ddb_item(item: &Item) -> DdbItem {
    item.iter().map(|(k, v)| (k.clone(), to_ddb(v))).collect()
}

fn from_ddb(value: &DdbValue) -> Result<AttributeValue> {
    Ok(match value {
        DdbValue::S(s) => AttributeValue::S(s.clone()),
        DdbValue::N(n) => AttributeValue::N(n.clone()),
        DdbValue::Bool(b) => AttributeValue::Bool(*b),
        DdbValue::Null(_) => AttributeValue::Null,
        DdbValue::L(values) => {
            AttributeValue::L(values.iter().map(from_ddb).collect::<Result<Vec<_>>>()?)
        }
        DdbValue::M(map) => AttributeValue::M(from_ddb_item(map)?),
        DdbValue::Ss(values) => {
            AttributeValue::L(values.iter().cloned().map(AttributeValue::S).collect())
        }
        DdbValue::Ns(values) => {
            AttributeValue::L(values.iter().cloned().map(AttributeValue::N).collect())
        }
        other => {
            return Err(TableError::Serialization(format!(
                "unsupported DynamoDB attribute type: {:?}",
                other
            )))
        }
    })
}

fn from_ddb_item(item: &DdbItem) -> Result<Item> {
    item.iter()
        .map(|(k, v)| Ok((k.clone(), from_ddb(v)?)))
        .collect()
}

// ----------------------------------------------------------------------------
// Schema conversion
// ----------------------------------------------------------------------------

fn build_error(err: BuildError) -> TableError {
    TableError::Validation(err.to_string())
}

fn key_elements(schema: &KeySchema) -> Result<Vec<KeySchemaElement>> {
    let mut elements = vec![KeySchemaElement::builder()
        .attribute_name(&schema.hash.name)
        .key_type(KeyType::Hash)
        .build()
        .map_err(build_error)?];
    if let Some(range) = &schema.range {
        elements.push(
            KeySchemaElement::builder()
                .attribute_name(&range.name)
                .key_type(KeyType::Range)
                .build()
                .map_err(build_error)?,
        );
    }
    Ok(elements)
}

fn attribute_definitions(attrs: &[KeyAttribute]) -> Result<Vec<AttributeDefinition>> {
    attrs
        .iter()
        .map(|attr| {
            let attribute_type = match attr.scalar_type {
                ScalarType::String => ScalarAttributeType::S,
                ScalarType::Number => ScalarAttributeType::N,
            };
            AttributeDefinition::builder()
                .attribute_name(&attr.name)
                .attribute_type(attribute_type)
                .build()
                .map_err(build_error)
        })
        .collect()
}

fn throughput(tp: &ProvisionedThroughput) -> Result<DdbThroughput> {
    DdbThroughput::builder()
        .read_capacity_units(tp.read_capacity_units)
        .write_capacity_units(tp.write_capacity_units)
        .build()
        .map_err(build_error)
}

fn projection(p: Projection) -> DdbProjection {
    let projection_type = match p {
        Projection::All => ProjectionType::All,
        Projection::KeysOnly => ProjectionType::KeysOnly,
    };
    DdbProjection::builder().projection_type(projection_type).build()
}

fn global_index(index: &SecondaryIndex) -> Result<GlobalSecondaryIndex> {
    GlobalSecondaryIndex::builder()
        .index_name(&index.name)
        .set_key_schema(Some(key_elements(&index.key_schema)?))
        .projection(projection(index.projection))
        .provisioned_throughput(throughput(&index.throughput)?)
        .build()
        .map_err(build_error)
}

fn create_index_action(index: &SecondaryIndex) -> Result<GlobalSecondaryIndexUpdate> {
    let action = CreateGlobalSecondaryIndexAction::builder()
        .index_name(&index.name)
        .set_key_schema(Some(key_elements(&index.key_schema)?))
        .projection(projection(index.projection))
        .provisioned_throughput(throughput(&index.throughput)?)
        .build()
        .map_err(build_error)?;
    Ok(GlobalSecondaryIndexUpdate::builder().create(action).build())
}

fn key_schema_from(elements: &[KeySchemaElement], definitions: &[AttributeDefinition]) -> Result<KeySchema> {
    let attr = |element: &KeySchemaElement| {
        let name = element.attribute_name().to_string();
        let is_number = definitions.iter().any(|d| {
            d.attribute_name() == name && *d.attribute_type() == ScalarAttributeType::N
        });
        if is_number {
            KeyAttribute::number(name)
        } else {
            KeyAttribute::string(name)
        }
    };

    let hash = elements
        .iter()
        .find(|e| *e.key_type() == KeyType::Hash)
        .map(attr)
        .ok_or_else(|| TableError::Backend("key schema without a HASH element".to_string()))?;
    let range = elements
        .iter()
        .find(|e| *e.key_type() == KeyType::Range)
        .map(attr);
    Ok(KeySchema { hash, range })
}

fn table_status(status: Option<&TableStatus>) -> ResourceStatus {
    match status {
        Some(TableStatus::Active) => ResourceStatus::Active,
        Some(TableStatus::Creating) => ResourceStatus::Creating,
        Some(TableStatus::Deleting) => ResourceStatus::Deleting,
        _ => ResourceStatus::Updating,
    }
}

fn index_status(status: Option<&IndexStatus>) -> ResourceStatus {
    match status {
        Some(IndexStatus::Active) => ResourceStatus::Active,
        Some(IndexStatus::Creating) => ResourceStatus::Creating,
        Some(IndexStatus::Deleting) => ResourceStatus::Deleting,
        _ => ResourceStatus::Updating,
    }
}

fn describe_from(table_name: &str, table: &DdbTableDescription) -> Result<TableDescription> {
    let definitions = table.attribute_definitions();
    let indexes = table
        .global_secondary_indexes()
        .iter()
        .map(|idx| {
            Ok(IndexDescription {
                name: idx.index_name().unwrap_or_default().to_string(),
                key_schema: key_schema_from(idx.key_schema(), definitions)?,
                status: index_status(idx.index_status()),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(TableDescription {
        table_name: table.table_name().unwrap_or(table_name).to_string(),
        key_schema: key_schema_from(table.key_schema(), definitions)?,
        status: table_status(table.table_status()),
        indexes,
        item_count: table.item_count().unwrap_or(0).max(0) as u64,
    })
}

// ----------------------------------------------------------------------------
// Errors
// ----------------------------------------------------------------------------

fn map_sdk_error<E, R>(table: &str, err: SdkError<E, R>) -> TableError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let message = err.message().unwrap_or_default().to_string();
    match err.code() {
        Some("ResourceNotFoundException") => TableError::TableNotFound(table.to_string()),
        Some("ResourceInUseException") if message.contains("exist") => {
            TableError::TableAlreadyExists(table.to_string())
        }
        Some("ConditionalCheckFailedException") => TableError::ConditionalCheckFailed {
            table: table.to_string(),
            condition: message,
        },
        Some("ValidationException") => TableError::Validation(message),
        _ => TableError::Backend(DisplayErrorContext(&err).to_string()),
    }
}

// ----------------------------------------------------------------------------
// Expressions
// ----------------------------------------------------------------------------

#[derive(Default)]
struct Expression {
    clauses: Vec<String>,
    names: HashMap<String, String>,
    values: DdbItem,
}

impl Expression {
    fn equals(&mut self, tag: &str, attribute: &str, value: &AttributeValue) {
        self.names.insert(format!("#{}", tag), attribute.to_string());
        self.values.insert(format!(":{}", tag), to_ddb(value));
        self.clauses.push(format!("#{} = :{}", tag, tag));
    }

    fn not_exists(&mut self, tag: &str, attribute: &str) {
        self.names.insert(format!("#{}", tag), attribute.to_string());
        self.clauses.push(format!("attribute_not_exists(#{})", tag));
    }

    fn condition(condition: Option<&Condition>) -> Self {
        let mut expr = Self::default();
        match condition {
            Some(Condition::AttributeNotExists(attr)) => expr.not_exists("c0", attr),
            Some(Condition::AttributeEquals(attr, value)) => expr.equals("c0", attr, value),
            None => {}
        }
        expr
    }

    fn text(&self) -> Option<String> {
        if self.clauses.is_empty() {
            None
        } else {
            Some(self.clauses.join(" AND "))
        }
    }

    fn names(&self) -> Option<HashMap<String, String>> {
        (!self.names.is_empty()).then(|| self.names.clone())
    }

    fn values(&self) -> Option<DdbItem> {
        (!self.values.is_empty()).then(|| self.values.clone())
    }
}

fn page_limit(limit: Option<usize>) -> Option<i32> {
    limit.map(|l| l.min(i32::MAX as usize) as i32)
}

#[async_trait]
impl TableBackend for DynamoDbBackend {
    async fn list_tables(
        &self,
        exclusive_start_table_name: Option<&str>,
        limit: Option<usize>,
    ) -> Result<TableNamePage> {
        let output = self
            .client
            .list_tables()
            .set_exclusive_start_table_name(exclusive_start_table_name.map(String::from))
            .set_limit(page_limit(limit))
            .send()
            .await
            .map_err(|e| map_sdk_error("<list>", e))?;

        Ok(TableNamePage {
            table_names: output.table_names().to_vec(),
            last_evaluated_table_name: output.last_evaluated_table_name().map(String::from),
        })
    }

    async fn describe_table(&self, table_name: &str) -> Result<TableDescription> {
        let output = self
            .client
            .describe_table()
            .table_name(table_name)
            .send()
            .await
            .map_err(|e| map_sdk_error(table_name, e))?;
        let table = output
            .table()
            .ok_or_else(|| TableError::TableNotFound(table_name.to_string()))?;
        describe_from(table_name, table)
    }

    async fn create_table(&self, schema: &TableSchema) -> Result<TableDescription> {
        let indexes = schema
            .indexes
            .iter()
            .map(global_index)
            .collect::<Result<Vec<_>>>()?;

        let output = self
            .client
            .create_table()
            .table_name(&schema.table_name)
            .set_key_schema(Some(key_elements(&schema.key_schema)?))
            .set_attribute_definitions(Some(attribute_definitions(&schema.attribute_definitions())?))
            .set_global_secondary_indexes(if indexes.is_empty() { None } else { Some(indexes) })
            .provisioned_throughput(throughput(&schema.throughput)?)
            .send()
            .await
            .map_err(|e| map_sdk_error(&schema.table_name, e))?;

        let table = output
            .table_description()
            .ok_or_else(|| TableError::Backend("CreateTable returned no description".to_string()))?;
        describe_from(&schema.table_name, table)
    }

    async fn update_table(
        &self,
        table_name: &str,
        add_indexes: &[SecondaryIndex],
    ) -> Result<TableDescription> {
        let mut attrs: Vec<KeyAttribute> = Vec::new();
        for attr in add_indexes.iter().flat_map(|idx| idx.key_schema.attributes()) {
            if !attrs.iter().any(|a| a.name == attr.name) {
                attrs.push(attr.clone());
            }
        }
        let updates = add_indexes
            .iter()
            .map(create_index_action)
            .collect::<Result<Vec<_>>>()?;

        let output = self
            .client
            .update_table()
            .table_name(table_name)
            .set_attribute_definitions(Some(attribute_definitions(&attrs)?))
            .set_global_secondary_index_updates(Some(updates))
            .send()
            .await
            .map_err(|e| match map_sdk_error(table_name, e) {
                TableError::Validation(msg) if msg.contains("already exists") => {
                    TableError::IndexAlreadyExists {
                        table: table_name.to_string(),
                        index: add_indexes
                            .iter()
                            .map(|idx| idx.name.as_str())
                            .collect::<Vec<_>>()
                            .join(","),
                    }
                }
                other => other,
            })?;

        let table = output
            .table_description()
            .ok_or_else(|| TableError::Backend("UpdateTable returned no description".to_string()))?;
        describe_from(table_name, table)
    }

    async fn put_item(
        &self,
        table_name: &str,
        item: Item,
        condition: Option<Condition>,
    ) -> Result<()> {
        let expr = Expression::condition(condition.as_ref());
        self.client
            .put_item()
            .table_name(table_name)
            .set_item(Some(to_ddb_item(&item)))
            .set_condition_expression(expr.text())
            .set_expression_attribute_names(expr.names())
            .set_expression_attribute_values(expr.values())
            .send()
            .await
            .map_err(|e| map_sdk_error(table_name, e))?;
        Ok(())
    }

    async fn get_item(&self, table_name: &str, key: &Item) -> Result<Option<Item>> {
        let output = self
            .client
            .get_item()
            .table_name(table_name)
            .set_key(Some(to_ddb_item(key)))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| map_sdk_error(table_name, e))?;
        output.item().map(from_ddb_item).transpose()
    }

    async fn delete_item(
        &self,
        table_name: &str,
        key: &Item,
        condition: Option<Condition>,
    ) -> Result<()> {
        let expr = Expression::condition(condition.as_ref());
        self.client
            .delete_item()
            .table_name(table_name)
            .set_key(Some(to_ddb_item(key)))
            .set_condition_expression(expr.text())
            .set_expression_attribute_names(expr.names())
            .set_expression_attribute_values(expr.values())
            .send()
            .await
            .map_err(|e| map_sdk_error(table_name, e))?;
        Ok(())
    }

    async fn query(&self, request: QueryRequest) -> Result<ItemPage> {
        let mut expr = Expression::default();
        let key = &request.key_condition;
        expr.equals("h", &key.hash_attribute, &key.hash_value);
        if let Some((attr, value)) = &key.range {
            expr.equals("r", attr, value);
        }

        let output = self
            .client
            .query()
            .table_name(&request.table_name)
            .set_index_name(request.index_name.clone())
            .set_key_condition_expression(expr.text())
            .set_expression_attribute_names(expr.names())
            .set_expression_attribute_values(expr.values())
            .set_limit(page_limit(request.limit))
            .set_exclusive_start_key(request.exclusive_start_key.as_ref().map(to_ddb_item))
            .send()
            .await
            .map_err(|e| map_sdk_error(&request.table_name, e))?;

        Ok(ItemPage {
            items: output
                .items()
                .iter()
                .map(from_ddb_item)
                .collect::<Result<Vec<_>>>()?,
            last_evaluated_key: output.last_evaluated_key().map(from_ddb_item).transpose()?,
        })
    }

    async fn scan(&self, request: ScanRequest) -> Result<ItemPage> {
        let mut expr = Expression::default();
        let mut residual = Vec::new();
        for (pos, filter) in request.filters.iter().enumerate() {
            match filter {
                ScanFilter::Equals { attribute, value } => {
                    expr.equals(&format!("f{}", pos), attribute, value)
                }
                other => residual.push(other.clone()),
            }
        }

        let output = self
            .client
            .scan()
            .table_name(&request.table_name)
            .set_filter_expression(expr.text())
            .set_expression_attribute_names(expr.names())
            .set_expression_attribute_values(expr.values())
            .set_limit(page_limit(request.limit))
            .set_exclusive_start_key(request.exclusive_start_key.as_ref().map(to_ddb_item))
            .send()
            .await
            .map_err(|e| map_sdk_error(&request.table_name, e))?;

        let mut items = Vec::new();
        for raw in output.items() {
            let item = from_ddb_item(raw)?;
            if residual.iter().all(|f| f.matches(&item)) {
                items.push(item);
            }
        }

        Ok(ItemPage {
            items,
            last_evaluated_key: output.last_evaluated_key().map(from_ddb_item).transpose()?,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversion_preserves_nesting() {
        let mut inner = Item::new();
        inner.insert("Type".into(), "role".into());
        let value = AttributeValue::L(vec![AttributeValue::M(inner), AttributeValue::Null]);

        let back = from_ddb(&to_ddb(&value)).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_condition_expression() {
        let expr = Expression::condition(Some(&Condition::AttributeEquals(
            "VersionNumber".into(),
            AttributeValue::number(4),
        )));
        assert_eq!(expr.text().as_deref(), Some("#c0 = :c0"));
        assert_eq!(expr.names().unwrap().get("#c0").map(String::as_str), Some("VersionNumber"));
        assert!(Expression::condition(None).text().is_none());
    }

    #[test]
    fn test_key_schema_round_trip() {
        let schema = KeySchema::hash_and_range(KeyAttribute::string("A"), KeyAttribute::number("B"));
        let elements = key_elements(&schema).unwrap();
        let defs = attribute_definitions(&[KeyAttribute::string("A"), KeyAttribute::number("B")]).unwrap();
        assert_eq!(key_schema_from(&elements, &defs).unwrap(), schema);
    }
}
