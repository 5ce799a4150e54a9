//! Table and secondary-index declarations, and the status a backend reports for them.

use crate::attribute::AttributeValue;

/// Scalar type of a key attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Number,
}

impl ScalarType {
    /// Whether `value` is acceptable for a key attribute of this type.
    pub fn accepts(&self, value: &AttributeValue) -> bool {
        matches!(
            (self, value),
            (ScalarType::String, AttributeValue::S(_)) | (ScalarType::Number, AttributeValue::N(_))
        )
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ScalarType::String => "S",
            ScalarType::Number => "N",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    pub name: String,
    pub scalar_type: ScalarType,
}

impl KeyAttribute {
    pub fn string(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scalar_type: ScalarType::String,
        }
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scalar_type: ScalarType::Number,
        }
    }
}

/// Hash key plus optional range key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    pub hash: KeyAttribute,
    pub range: Option<KeyAttribute>,
}

impl KeySchema {
    pub fn hash(hash: KeyAttribute) -> Self {
        Self { hash, range: None }
    }

    pub fn hash_and_range(hash: KeyAttribute, range: KeyAttribute) -> Self {
        Self {
            hash,
            range: Some(range),
        }
    }

    /// Key attributes in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = &KeyAttribute> {
        std::iter::once(&self.hash).chain(self.range.iter())
    }
}

/// Which attributes a secondary index copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    #[default]
    All,
    KeysOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionedThroughput {
    pub read_capacity_units: i64,
    pub write_capacity_units: i64,
}

impl Default for ProvisionedThroughput {
    fn default() -> Self {
        Self {
            read_capacity_units: 5,
            write_capacity_units: 5,
        }
    }
}

/// A global secondary index declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryIndex {
    pub name: String,
    pub key_schema: KeySchema,
    pub projection: Projection,
    pub throughput: ProvisionedThroughput,
}

impl SecondaryIndex {
    pub fn new(name: impl Into<String>, key_schema: KeySchema) -> Self {
        Self {
            name: name.into(),
            key_schema,
            projection: Projection::All,
            throughput: ProvisionedThroughput::default(),
        }
    }

    pub fn with_throughput(mut self, throughput: ProvisionedThroughput) -> Self {
        self.throughput = throughput;
        self
    }
}

/// Full declaration of a table: what the schema manager converges to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table_name: String,
    pub key_schema: KeySchema,
    pub indexes: Vec<SecondaryIndex>,
    pub throughput: ProvisionedThroughput,
}

impl TableSchema {
    pub fn new(table_name: impl Into<String>, key_schema: KeySchema) -> Self {
        Self {
            table_name: table_name.into(),
            key_schema,
            indexes: Vec::new(),
            throughput: ProvisionedThroughput::default(),
        }
    }

    pub fn with_index(mut self, index: SecondaryIndex) -> Self {
        self.indexes.push(index);
        self
    }

    /// Sets the table throughput and applies it to every index declared so far.
    pub fn with_throughput(mut self, throughput: ProvisionedThroughput) -> Self {
        self.throughput = throughput;
        for index in &mut self.indexes {
            index.throughput = throughput;
        }
        self
    }

    pub fn index(&self, name: &str) -> Option<&SecondaryIndex> {
        self.indexes.iter().find(|idx| idx.name == name)
    }

    /// Every distinct key attribute used by the table or its indexes.
    pub fn attribute_definitions(&self) -> Vec<KeyAttribute> {
        let mut defs: Vec<KeyAttribute> = Vec::new();
        let all = self
            .key_schema
            .attributes()
            .chain(self.indexes.iter().flat_map(|idx| idx.key_schema.attributes()));
        for attr in all {
            if !defs.iter().any(|d| d.name == attr.name) {
                defs.push(attr.clone());
            }
        }
        defs
    }
}

/// Lifecycle state of a table or index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    Creating,
    Updating,
    Active,
    Deleting,
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResourceStatus::Creating => "CREATING",
            ResourceStatus::Updating => "UPDATING",
            ResourceStatus::Active => "ACTIVE",
            ResourceStatus::Deleting => "DELETING",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDescription {
    pub name: String,
    pub key_schema: KeySchema,
    pub status: ResourceStatus,
}

/// What a backend reports about an existing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescription {
    pub table_name: String,
    pub key_schema: KeySchema,
    pub status: ResourceStatus,
    pub indexes: Vec<IndexDescription>,
    pub item_count: u64,
}

impl TableDescription {
    /// True when the table and every index are `Active`.
    pub fn is_active(&self) -> bool {
        self.status == ResourceStatus::Active
            && self
                .indexes
                .iter()
                .all(|idx| idx.status == ResourceStatus::Active)
    }

    pub fn index_names(&self) -> Vec<&str> {
        self.indexes.iter().map(|idx| idx.name.as_str()).collect()
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.indexes.iter().any(|idx| idx.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_definitions_are_deduplicated() {
        let schema = TableSchema::new("things", KeySchema::hash(KeyAttribute::string("Id")))
            .with_index(SecondaryIndex::new(
                "A-B-index",
                KeySchema::hash_and_range(KeyAttribute::string("A"), KeyAttribute::string("B")),
            ))
            .with_index(SecondaryIndex::new(
                "B-A-index",
                KeySchema::hash_and_range(KeyAttribute::string("B"), KeyAttribute::string("A")),
            ));

        let names: Vec<String> = schema
            .attribute_definitions()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["Id", "A", "B"]);
    }

    #[test]
    fn test_with_throughput_applies_to_indexes() {
        let tp = ProvisionedThroughput {
            read_capacity_units: 10,
            write_capacity_units: 2,
        };
        let schema = TableSchema::new("things", KeySchema::hash(KeyAttribute::string("Id")))
            .with_index(SecondaryIndex::new("X-index", KeySchema::hash(KeyAttribute::string("X"))))
            .with_throughput(tp);
        assert_eq!(schema.indexes[0].throughput, tp);
    }
}
