//! Point reads, writes and deletes.
//!
//! This is the only place where API bin values are converted to and from the
//! store's native values.

use crate::connection::ConnectionManager;
use crate::error::CoreError;
use crate::session::Session;
use crate::value::BinValue;
use aerodeck_cluster::policy::{TTL_DONT_UPDATE, TTL_NAMESPACE_DEFAULT};
use aerodeck_cluster::{signed_byte_array, Bins, Key, Record, UserKey, Value, WritePolicy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A record together with its key and store metadata.
///
/// `generation`, `expiration` and `ttl` are filled in by reads. On writes only
/// `ttl` is honored, as an expiration override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordEnvelope {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub set_name: String,
    pub key: Option<BinValue>,
    pub bins: Option<BTreeMap<String, BinValue>>,
    pub generation: Option<u32>,
    pub expiration: Option<u32>,
    pub ttl: Option<i32>,
}

impl RecordEnvelope {
    pub fn new(
        namespace: impl Into<String>,
        set_name: impl Into<String>,
        key: impl Into<BinValue>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            set_name: set_name.into(),
            key: Some(key.into()),
            ..Default::default()
        }
    }

    pub fn with_bins(mut self, bins: BTreeMap<String, BinValue>) -> Self {
        self.bins = Some(bins);
        self
    }

    pub fn with_ttl(mut self, ttl: i32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Projects a stored record into an envelope.
    pub fn from_record(key: &Key, key_value: BinValue, record: Record) -> Self {
        let ttl = record.time_to_live();
        Self {
            namespace: key.namespace.clone(),
            set_name: key.set_name.clone(),
            key: Some(key_value),
            bins: Some(
                record
                    .bins
                    .into_iter()
                    .map(|(name, value)| (name, BinValue::from(value)))
                    .collect(),
            ),
            generation: Some(record.generation),
            expiration: Some(record.expiration),
            ttl: Some(ttl),
        }
    }
}

/// Returns the text form of a record key.
///
/// A user key prints as itself. A digest-only key prints its digest as
/// `[b0, b1, ...]` with each byte as a signed 8-bit integer.
pub fn key_text(key: &Key) -> String {
    match &key.user_key {
        Some(user_key) => user_key.to_string(),
        None => signed_byte_array(&key.digest),
    }
}

/// Returns the API value of a record key.
///
/// Integer and string user keys keep their type; anything else uses
/// [`key_text`].
pub fn key_value(key: &Key) -> BinValue {
    match &key.user_key {
        Some(UserKey::Int(i)) => BinValue::Int(*i),
        Some(UserKey::String(s)) => BinValue::String(s.clone()),
        _ => BinValue::String(key_text(key)),
    }
}

/// Point record operations against the live session.
pub struct RecordStore {
    connections: Arc<ConnectionManager>,
    send_key: bool,
}

impl RecordStore {
    /// Creates a store that stores user keys with written records.
    pub fn new(connections: Arc<ConnectionManager>) -> Self {
        Self {
            connections,
            send_key: true,
        }
    }

    /// Sets whether written records carry their user key.
    pub fn with_send_key(mut self, send_key: bool) -> Self {
        self.send_key = send_key;
        self
    }

    /// Reads one record. `Ok(None)` means the record does not exist.
    pub fn get(
        &self,
        namespace: &str,
        set_name: &str,
        user_key: &str,
    ) -> Result<Option<RecordEnvelope>, CoreError> {
        let session = self.connections.require_session()?;
        let envelope = read(&session, namespace, set_name, user_key)
            .map_err(CoreError::operation("get record"))?;
        session.record_operation();
        Ok(envelope)
    }

    /// Writes the envelope's bins and returns the record as persisted.
    ///
    /// Returns `Ok(None)` if the record is gone by the time it is read back,
    /// e.g. when every bin was removed.
    pub fn put(&self, envelope: RecordEnvelope) -> Result<Option<RecordEnvelope>, CoreError> {
        let session = self.connections.require_session()?;

        if envelope.namespace.is_empty() {
            return Err(CoreError::InvalidRequest("namespace is required".to_string()));
        }
        let user_key = envelope
            .key
            .as_ref()
            .filter(|k| !k.is_null())
            .map(BinValue::to_string)
            .ok_or_else(|| CoreError::InvalidRequest("key is required".to_string()))?;
        let bins: Bins = envelope
            .bins
            .ok_or_else(|| CoreError::InvalidRequest("bins must be an object".to_string()))?
            .into_iter()
            .map(|(name, value)| (name, Value::from(value)))
            .collect();

        let expiration = envelope.ttl.unwrap_or(TTL_NAMESPACE_DEFAULT);
        if expiration < TTL_DONT_UPDATE {
            return Err(CoreError::InvalidRequest(format!(
                "invalid ttl: {}",
                expiration
            )));
        }
        let policy = WritePolicy::default()
            .with_expiration(expiration)
            .with_send_key(self.send_key);

        let key = Key::new(
            envelope.namespace.as_str(),
            envelope.set_name.as_str(),
            user_key.as_str(),
        );
        session
            .client()
            .put(&policy, &key, &bins)
            .map_err(CoreError::operation("put record"))?;
        tracing::debug!(
            "Put {}.{}/{} ({} bins)",
            key.namespace,
            key.set_name,
            user_key,
            bins.len()
        );

        let persisted = read(&session, &key.namespace, &key.set_name, &user_key)
            .map_err(CoreError::operation("put record"))?;
        session.record_operation();
        Ok(persisted)
    }

    /// Deletes one record, returning whether it existed.
    pub fn delete(
        &self,
        namespace: &str,
        set_name: &str,
        user_key: &str,
    ) -> Result<bool, CoreError> {
        let session = self.connections.require_session()?;
        let key = Key::new(namespace, set_name, user_key);
        let existed = session
            .client()
            .delete(&key)
            .map_err(CoreError::operation("delete record"))?;
        session.record_operation();
        tracing::debug!("Delete {}.{}/{} -> {}", namespace, set_name, user_key, existed);
        Ok(existed)
    }
}

fn read(
    session: &Session,
    namespace: &str,
    set_name: &str,
    user_key: &str,
) -> Result<Option<RecordEnvelope>, aerodeck_cluster::ClusterError> {
    let key = Key::new(namespace, set_name, user_key);
    let record = session.client().get(&key)?;
    Ok(record.map(|record| RecordEnvelope::from_record(&key, BinValue::from(user_key), record)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{cluster, connected_manager};

    fn store() -> RecordStore {
        RecordStore::new(Arc::new(connected_manager()))
    }

    fn bins(pairs: &[(&str, BinValue)]) -> BTreeMap<String, BinValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_put_long_bin_name_is_invalid_request() {
        let store = store();
        let err = store
            .put(
                RecordEnvelope::new("test", "users", "u1")
                    .with_bins(bins(&[("a_bin_name_over_15", BinValue::Int(1))])),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidRequest(_)));
        assert!(store.get("test", "users", "u1").unwrap().is_none());
    }

    #[test]
    fn test_put_then_get_round_trip() {
        let store = store();
        let written = bins(&[
            ("name", BinValue::from("alice")),
            ("age", BinValue::Int(30)),
            ("tags", BinValue::List(vec![BinValue::from("a")])),
        ]);

        let persisted = store
            .put(RecordEnvelope::new("test", "users", "u1").with_bins(written.clone()))
            .unwrap()
            .unwrap();
        assert_eq!(persisted.bins.as_ref(), Some(&written));
        assert_eq!(persisted.generation, Some(1));

        let read = store.get("test", "users", "u1").unwrap().unwrap();
        assert_eq!(read.bins, Some(written));
        assert_eq!(read.key, Some(BinValue::from("u1")));
        assert_eq!(read.namespace, "test");
        assert_eq!(read.set_name, "users");
        assert!(read.generation.unwrap() >= 1);
        assert_eq!(read.ttl, Some(-1));
    }

    #[test]
    fn test_put_honors_ttl_override() {
        let store = store();
        let persisted = store
            .put(
                RecordEnvelope::new("test", "users", "u1")
                    .with_bins(bins(&[("a", BinValue::Int(1))]))
                    .with_ttl(3600),
            )
            .unwrap()
            .unwrap();
        let ttl = persisted.ttl.unwrap();
        assert!(ttl > 3590 && ttl <= 3600, "ttl was {}", ttl);
        assert!(persisted.expiration.unwrap() > 0);
    }

    #[test]
    fn test_put_ignores_client_generation() {
        let store = store();
        let mut envelope =
            RecordEnvelope::new("test", "users", "u1").with_bins(bins(&[("a", BinValue::Int(1))]));
        envelope.generation = Some(99);
        store.put(envelope.clone()).unwrap();
        let persisted = store.put(envelope).unwrap().unwrap();
        assert_eq!(persisted.generation, Some(2));
    }

    #[test]
    fn test_integer_key_is_stringified() {
        let store = store();
        store
            .put(RecordEnvelope::new("test", "users", 42i64).with_bins(bins(&[("a", BinValue::Int(1))])))
            .unwrap();
        assert!(store.get("test", "users", "42").unwrap().is_some());
    }

    #[test]
    fn test_get_missing_is_none() {
        assert!(store().get("test", "users", "nobody").unwrap().is_none());
    }

    #[test]
    fn test_delete_semantics() {
        let store = store();
        assert!(!store.delete("test", "users", "ghost").unwrap());

        store
            .put(RecordEnvelope::new("test", "users", "u1").with_bins(bins(&[("a", BinValue::Int(1))])))
            .unwrap();
        assert!(store.delete("test", "users", "u1").unwrap());
        assert!(!store.delete("test", "users", "u1").unwrap());
        assert!(store.get("test", "users", "u1").unwrap().is_none());
    }

    #[test]
    fn test_put_validation() {
        let store = store();
        let missing_bins = RecordEnvelope::new("test", "users", "u1");
        assert!(matches!(
            store.put(missing_bins),
            Err(CoreError::InvalidRequest(_))
        ));

        let missing_key = RecordEnvelope {
            namespace: "test".to_string(),
            bins: Some(BTreeMap::new()),
            ..Default::default()
        };
        assert!(matches!(
            store.put(missing_key),
            Err(CoreError::InvalidRequest(_))
        ));

        let bad_ttl = RecordEnvelope::new("test", "users", "u1")
            .with_bins(bins(&[("a", BinValue::Int(1))]))
            .with_ttl(-5);
        assert!(matches!(store.put(bad_ttl), Err(CoreError::InvalidRequest(_))));
    }

    #[test]
    fn test_store_errors_are_wrapped() {
        let err = store().get("missing", "users", "u1").unwrap_err();
        assert!(err.to_string().starts_with("Failed to get record"));
        assert_eq!(err.error_code(), "OPERATION_FAILED");
    }

    #[test]
    fn test_requires_session() {
        let store = RecordStore::new(Arc::new(ConnectionManager::new(Arc::new(cluster()))));
        assert!(matches!(
            store.get("test", "users", "u1"),
            Err(CoreError::NotConnected)
        ));
        assert!(matches!(
            store.delete("test", "users", "u1"),
            Err(CoreError::NotConnected)
        ));
    }

    #[test]
    fn test_key_text() {
        let key = Key::new("test", "users", "user123");
        assert_eq!(key_text(&key), "user123");
        assert_eq!(key_text(&Key::new("test", "users", 7i64)), "7");

        let digest_only = Key::from_digest("test", "users", [0xff; 20]);
        let text = key_text(&digest_only);
        assert!(text.starts_with("[-1, -1"));
        assert_eq!(text.matches(", ").count(), 19);
    }

    #[test]
    fn test_key_value() {
        assert_eq!(key_value(&Key::new("t", "s", 7i64)), BinValue::Int(7));
        assert_eq!(key_value(&Key::new("t", "s", "k")), BinValue::from("k"));
        let digest_only = Key::from_digest("t", "s", [1; 20]);
        assert_eq!(key_value(&digest_only), BinValue::String(key_text(&digest_only)));
    }

    #[test]
    fn test_envelope_json_shape() {
        let envelope: RecordEnvelope = serde_json::from_str(
            r#"{"namespace":"test","setName":"users","key":"u1","bins":{"a":1},"ttl":60}"#,
        )
        .unwrap();
        assert_eq!(envelope.set_name, "users");
        assert_eq!(envelope.ttl, Some(60));
        assert_eq!(envelope.generation, None);
    }
}
