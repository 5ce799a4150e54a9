//! Record <-> item conversion through serde.
//!
//! Entities are serialized with `serde_json` into a JSON object and the object
//! is mapped attribute by attribute. Top-level `null`s are dropped so optional
//! fields that double as index keys (a user without an email, for example)
//! leave the index sparse instead of failing key-type validation.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::attribute::{AttributeValue, Item};
use crate::error::{Result, TableError};

/// Serializes a record into an item. The record must serialize as a map.
pub fn to_item<T: Serialize>(value: &T) -> Result<Item> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map
            .into_iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k, json_to_attribute(v)))
            .collect()),
        other => Err(TableError::Serialization(format!(
            "expected a record to serialize as a map, got {}",
            json_type_name(&other)
        ))),
    }
}

/// Deserializes a record from an item.
pub fn from_item<T: DeserializeOwned>(item: &Item) -> Result<T> {
    let map: Map<String, Value> = item
        .iter()
        .map(|(k, v)| Ok((k.clone(), attribute_to_json(v)?)))
        .collect::<Result<_>>()?;
    Ok(serde_json::from_value(Value::Object(map))?)
}

pub fn json_to_attribute(value: Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null,
        Value::Bool(b) => AttributeValue::Bool(b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s),
        Value::Array(values) => {
            AttributeValue::L(values.into_iter().map(json_to_attribute).collect())
        }
        Value::Object(map) => AttributeValue::M(
            map.into_iter()
                .map(|(k, v)| (k, json_to_attribute(v)))
                .collect(),
        ),
    }
}

pub fn attribute_to_json(value: &AttributeValue) -> Result<Value> {
    Ok(match value {
        AttributeValue::Null => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::N(n) => Value::Number(parse_number(n)?),
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::L(values) => Value::Array(
            values
                .iter()
                .map(attribute_to_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), attribute_to_json(v)?)))
                .collect::<Result<Map<_, _>>>()?,
        ),
    })
}

fn parse_number(raw: &str) -> Result<Number> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Number(n)) => Ok(n),
        _ => Err(TableError::Serialization(format!("invalid number attribute '{}'", raw))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
