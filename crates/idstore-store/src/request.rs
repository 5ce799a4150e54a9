//! Conditions, key conditions and filters for item-level requests.

use crate::attribute::{AttributeValue, Item};

/// Precondition attached to a put or delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// The stored item (if any) must not carry this attribute.
    AttributeNotExists(String),
    /// The stored item must exist and carry exactly this value.
    AttributeEquals(String, AttributeValue),
}

impl Condition {
    pub fn evaluate(&self, existing: Option<&Item>) -> bool {
        match self {
            Condition::AttributeNotExists(attr) => {
                existing.map_or(true, |item| !item.contains_key(attr))
            }
            Condition::AttributeEquals(attr, expected) => {
                existing.and_then(|item| item.get(attr)) == Some(expected)
            }
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::AttributeNotExists(attr) => write!(f, "attribute_not_exists({})", attr),
            Condition::AttributeEquals(attr, value) => write!(f, "{} = {:?}", attr, value),
        }
    }
}

/// Equality on the hash key, optionally also on the range key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCondition {
    pub hash_attribute: String,
    pub hash_value: AttributeValue,
    pub range: Option<(String, AttributeValue)>,
}

impl KeyCondition {
    pub fn hash(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            hash_attribute: attribute.into(),
            hash_value: value.into(),
            range: None,
        }
    }

    pub fn and_range(mut self, attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.range = Some((attribute.into(), value.into()));
        self
    }

    pub fn matches(&self, item: &Item) -> bool {
        if item.get(&self.hash_attribute) != Some(&self.hash_value) {
            return false;
        }
        match &self.range {
            Some((attr, value)) => item.get(attr) == Some(value),
            None => true,
        }
    }
}

/// Non-key predicate evaluated against scanned items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanFilter {
    /// Top-level attribute equals a value.
    Equals {
        attribute: String,
        value: AttributeValue,
    },
    /// A list attribute holds at least one map element whose fields include
    /// every entry of `fields` (other fields of the element are ignored).
    ListContainsMatch { attribute: String, fields: Item },
}

impl ScanFilter {
    pub fn equals(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        ScanFilter::Equals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn list_contains_match<I, K, V>(attribute: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        ScanFilter::ListContainsMatch {
            attribute: attribute.into(),
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn matches(&self, item: &Item) -> bool {
        match self {
            ScanFilter::Equals { attribute, value } => item.get(attribute) == Some(value),
            ScanFilter::ListContainsMatch { attribute, fields } => item
                .get(attribute)
                .and_then(|v| v.as_l())
                .map_or(false, |elements| {
                    elements.iter().any(|element| {
                        element.as_m().map_or(false, |map| {
                            fields.iter().all(|(k, v)| map.get(k) == Some(v))
                        })
                    })
                }),
        }
    }
}

/// Query against the table's primary key or one of its secondary indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub table_name: String,
    pub index_name: Option<String>,
    pub key_condition: KeyCondition,
    pub limit: Option<usize>,
    pub exclusive_start_key: Option<Item>,
}

impl QueryRequest {
    pub fn new(table_name: impl Into<String>, key_condition: KeyCondition) -> Self {
        Self {
            table_name: table_name.into(),
            index_name: None,
            key_condition,
            limit: None,
            exclusive_start_key: None,
        }
    }

    pub fn on_index(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = Some(index_name.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn starting_after(mut self, key: Option<Item>) -> Self {
        self.exclusive_start_key = key;
        self
    }
}

/// Full-table scan; `limit` caps the items evaluated per page, before filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub table_name: String,
    pub filters: Vec<ScanFilter>,
    pub limit: Option<usize>,
    pub exclusive_start_key: Option<Item>,
}

impl ScanRequest {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            filters: Vec::new(),
            limit: None,
            exclusive_start_key: None,
        }
    }

    pub fn with_filter(mut self, filter: ScanFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn starting_after(mut self, key: Option<Item>) -> Self {
        self.exclusive_start_key = key;
        self
    }

    /// Whether an item passes every filter.
    pub fn accepts(&self, item: &Item) -> bool {
        self.filters.iter().all(|f| f.matches(item))
    }
}

/// One page of query or scan results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPage {
    pub items: Vec<Item>,
    /// Present when more pages remain; pass back as `exclusive_start_key`.
    pub last_evaluated_key: Option<Item>,
}

/// One page of table names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableNamePage {
    pub table_names: Vec<String>,
    pub last_evaluated_table_name: Option<String>,
}
