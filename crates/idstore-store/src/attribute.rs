//! Item model shared by every table backend.
//!
//! Mirrors the attribute-value model of managed key-value table services:
//! an item is a map from attribute name to a typed value, with numbers kept
//! in their decimal text form so no precision is lost in transit.

use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A stored record: attribute name to value.
pub type Item = BTreeMap<String, AttributeValue>;

/// A single typed attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// String
    S(String),
    /// Number, in decimal text form
    N(String),
    Bool(bool),
    Null,
    /// Ordered list of values
    L(Vec<AttributeValue>),
    /// Nested map
    M(Item),
}

impl AttributeValue {
    pub fn string(value: impl Into<String>) -> Self {
        AttributeValue::S(value.into())
    }

    pub fn number(value: i64) -> Self {
        AttributeValue::N(value.to_string())
    }

    pub fn as_s(&self) -> Option<&str> {
        match self {
            AttributeValue::S(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::N(n) => n.parse().ok(),
            _ => None,
        }
    }

    pub fn as_l(&self) -> Option<&[AttributeValue]> {
        match self {
            AttributeValue::L(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_m(&self) -> Option<&Item> {
        match self {
            AttributeValue::M(map) => Some(map),
            _ => None,
        }
    }

    /// Short type tag as used in validation messages ("S", "N", ...).
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::S(_) => "S",
            AttributeValue::N(_) => "N",
            AttributeValue::Bool(_) => "BOOL",
            AttributeValue::Null => "NULL",
            AttributeValue::L(_) => "L",
            AttributeValue::M(_) => "M",
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::S(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::S(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(n: i64) -> Self {
        AttributeValue::number(n)
    }
}

/// Builds a single-attribute string key.
pub fn string_key(attribute: &str, value: impl Into<String>) -> Item {
    let mut key = Item::new();
    key.insert(attribute.to_string(), AttributeValue::S(value.into()));
    key
}

/// Total order used for key attributes: strings lexicographically, numbers numerically.
pub fn compare_key_values(a: Option<&AttributeValue>, b: Option<&AttributeValue>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(AttributeValue::S(x)), Some(AttributeValue::S(y))) => x.cmp(y),
        (Some(AttributeValue::N(x)), Some(AttributeValue::N(y))) => {
            match (x.parse::<f64>(), y.parse::<f64>()) {
                (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                _ => x.cmp(y),
            }
        }
        (Some(x), Some(y)) => x.type_name().cmp(y.type_name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_compare_numerically() {
        let nine = AttributeValue::number(9);
        let ten = AttributeValue::number(10);
        assert_eq!(compare_key_values(Some(&nine), Some(&ten)), Ordering::Less);
        assert_eq!(ten.as_i64(), Some(10));
    }

    #[test]
    fn test_string_key() {
        let key = string_key("Id", "abc");
        assert_eq!(key.get("Id").and_then(|v| v.as_s()), Some("abc"));
        assert_eq!(key.len(), 1);
    }
}
