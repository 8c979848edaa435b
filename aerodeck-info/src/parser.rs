//! Info response parsing.
//!
//! An info response segment looks like `objects=12:replication-factor=2:storage-engine=memory`.
//! Pairs are separated by `:` and split on the first `=` only, so values may
//! themselves contain `=`. Pairs without an `=` are skipped. List responses
//! (`sets/<ns>`, `namespaces`) join several segments or names with `;`.

use crate::{PAIR_SEPARATOR, SEGMENT_SEPARATOR};
use std::collections::BTreeMap;

/// Ordered key/value pairs parsed from one info segment.
///
/// Keys are unique: inserting an existing key overwrites its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoRecord {
    pairs: Vec<(String, String)>,
}

impl InfoRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a pair; the last write for a key wins.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((key, value)),
        }
    }

    /// Returns the value for a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the value for a key coerced to an integer.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        parse_i64(self.get(key))
    }

    /// Returns whether the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterates pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns true if no pairs were parsed.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Converts into a sorted map.
    pub fn into_map(self) -> BTreeMap<String, String> {
        self.pairs.into_iter().collect()
    }
}

impl FromIterator<(String, String)> for InfoRecord {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut record = InfoRecord::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// Parses one info segment into an [`InfoRecord`].
///
/// Empty input yields an empty record.
pub fn parse_info(input: &str) -> InfoRecord {
    let mut record = InfoRecord::new();
    if input.is_empty() {
        return record;
    }

    for pair in input.split(PAIR_SEPARATOR) {
        if let Some((key, value)) = pair.split_once('=') {
            record.insert(key, value);
        }
    }
    record
}

/// Parses a `;`-separated list of segments, skipping empty ones.
pub fn parse_info_list(input: &str) -> Vec<InfoRecord> {
    input
        .split(SEGMENT_SEPARATOR)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(parse_info)
        .collect()
}

/// Splits a `;`-separated name list, skipping empty tokens.
pub fn split_names(input: &str) -> Vec<String> {
    input
        .split(SEGMENT_SEPARATOR)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Coerces an optional string to an integer.
///
/// Returns `None` when the value is absent or not numeric.
pub fn parse_i64(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.trim().parse().ok())
}
