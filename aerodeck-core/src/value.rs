//! Bin values at the API boundary.

use aerodeck_cluster::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A dynamically typed bin value as exchanged with API callers.
///
/// Serialized untagged, so `{"age": 42, "tags": ["a"]}` maps to
/// `Int(42)` and `List([String("a")])`. Integers that do not fit `i64`
/// deserialize as `Float`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BinValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<BinValue>),
    Map(BTreeMap<String, BinValue>),
}

impl BinValue {
    pub fn is_null(&self) -> bool {
        matches!(self, BinValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            BinValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Value> for BinValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Nil => BinValue::Null,
            Value::Bool(b) => BinValue::Bool(b),
            Value::Int(i) => BinValue::Int(i),
            Value::Float(f) => BinValue::Float(f),
            Value::String(s) => BinValue::String(s),
            Value::Blob(bytes) => {
                BinValue::List(bytes.into_iter().map(|b| BinValue::Int(b as i64)).collect())
            }
            Value::List(items) => BinValue::List(items.into_iter().map(BinValue::from).collect()),
            Value::Map(entries) => BinValue::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, BinValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<BinValue> for Value {
    fn from(value: BinValue) -> Self {
        match value {
            BinValue::Null => Value::Nil,
            BinValue::Bool(b) => Value::Bool(b),
            BinValue::Int(i) => Value::Int(i),
            BinValue::Float(f) => Value::Float(f),
            BinValue::String(s) => Value::String(s),
            BinValue::List(items) => Value::List(items.into_iter().map(Value::from).collect()),
            BinValue::Map(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for BinValue {
    fn from(v: &str) -> Self {
        BinValue::String(v.to_string())
    }
}

impl From<String> for BinValue {
    fn from(v: String) -> Self {
        BinValue::String(v)
    }
}

impl From<i64> for BinValue {
    fn from(v: i64) -> Self {
        BinValue::Int(v)
    }
}

impl From<bool> for BinValue {
    fn from(v: bool) -> Self {
        BinValue::Bool(v)
    }
}

impl fmt::Display for BinValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinValue::String(s) => f.write_str(s),
            BinValue::Int(i) => write!(f, "{}", i),
            other => write!(f, "{}", Value::from(other.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_untagged() {
        let bins: BTreeMap<String, BinValue> = serde_json::from_value(json!({
            "name": "alice",
            "age": 42,
            "score": 9.5,
            "active": true,
            "nickname": null,
            "tags": ["a", 1],
            "address": {"city": "Oslo"}
        }))
        .unwrap();

        assert_eq!(bins["name"], BinValue::from("alice"));
        assert_eq!(bins["age"], BinValue::Int(42));
        assert_eq!(bins["score"], BinValue::Float(9.5));
        assert_eq!(bins["active"], BinValue::Bool(true));
        assert!(bins["nickname"].is_null());
        assert_eq!(
            bins["tags"],
            BinValue::List(vec![BinValue::from("a"), BinValue::Int(1)])
        );
        assert!(matches!(bins["address"], BinValue::Map(_)));
    }

    #[test]
    fn test_serialize_plain_json() {
        let value = BinValue::List(vec![BinValue::Int(1), BinValue::Null]);
        assert_eq!(serde_json::to_value(&value).unwrap(), json!([1, null]));
    }

    #[test]
    fn test_blob_surfaces_as_byte_list() {
        let value = BinValue::from(Value::Blob(vec![0, 255]));
        assert_eq!(
            value,
            BinValue::List(vec![BinValue::Int(0), BinValue::Int(255)])
        );
    }

    #[test]
    fn test_nested_conversion_to_store_value() {
        let mut map = BTreeMap::new();
        map.insert("n".to_string(), BinValue::Int(1));
        let value = Value::from(BinValue::Map(map));

        let mut expected = BTreeMap::new();
        expected.insert("n".to_string(), Value::Int(1));
        assert_eq!(value, Value::Map(expected));
    }

    #[test]
    fn test_display() {
        assert_eq!(BinValue::from("user1").to_string(), "user1");
        assert_eq!(BinValue::Int(-3).to_string(), "-3");
        assert_eq!(BinValue::Bool(true).to_string(), "true");
    }
}
