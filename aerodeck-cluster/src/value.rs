//! Native record values.

use std::collections::BTreeMap;
use std::fmt;

/// A value as stored by the cluster.
///
/// Map keys are restricted to strings.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Blob(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Returns true for `Nil`.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Approximate in-memory footprint in bytes, used for set statistics.
    pub fn estimated_size(&self) -> u64 {
        match self {
            Value::Nil => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 8,
            Value::String(s) => s.len() as u64,
            Value::Blob(b) => b.len() as u64,
            Value::List(items) => items.iter().map(Value::estimated_size).sum::<u64>() + 8,
            Value::Map(entries) => {
                entries
                    .iter()
                    .map(|(k, v)| k.len() as u64 + v.estimated_size())
                    .sum::<u64>()
                    + 8
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(s) => f.write_str(s),
            Value::Blob(b) => f.write_str(&signed_byte_array(b)),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}={}", k, v)?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Renders bytes as `[b0, b1, ...]` with each byte as a signed 8-bit integer.
pub fn signed_byte_array(bytes: &[u8]) -> String {
    let items: Vec<String> = bytes.iter().map(|b| (*b as i8).to_string()).collect();
    format!("[{}]", items.join(", "))
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_byte_array() {
        assert_eq!(signed_byte_array(&[1, 255, 128, 0]), "[1, -1, -128, 0]");
        assert_eq!(signed_byte_array(&[]), "[]");
    }

    #[test]
    fn test_display_nested() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), Value::Int(1));
        let value = Value::List(vec![Value::from("x"), Value::Map(map)]);
        assert_eq!(value.to_string(), "[x, {a=1}]");
    }

    #[test]
    fn test_estimated_size() {
        assert_eq!(Value::from("abcd").estimated_size(), 4);
        assert_eq!(Value::Nil.estimated_size(), 0);
        assert_eq!(Value::List(vec![Value::Int(1)]).estimated_size(), 16);
    }
}
