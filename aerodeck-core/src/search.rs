//! Bounded scans and key-pattern search.
//!
//! Search is evaluated client side: the namespace (or set) is scanned and each
//! record's key text is matched against the pattern. The scan is over-read by
//! a fixed factor of the requested result count, so sparse matches may yield
//! fewer results than requested even when more exist.

use crate::connection::ConnectionManager;
use crate::error::CoreError;
use crate::record::{key_text, key_value, RecordEnvelope};
use aerodeck_cluster::{ScanControl, ScanPolicy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result count used when a query does not specify one.
pub const DEFAULT_MAX_RESULTS: u32 = 100;

/// Records scanned per requested result.
pub const OVERSCAN_FACTOR: u64 = 10;

/// Scan cap used when a query has no result count.
pub const DEFAULT_SCAN_CAP: u64 = 1000;

/// How a key is compared with a search pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchMode {
    #[serde(alias = "exact")]
    Exact,
    #[serde(alias = "prefix")]
    Prefix,
    #[serde(alias = "suffix")]
    Suffix,
    #[serde(alias = "contains")]
    Contains,
}

impl MatchMode {
    /// Tests a key text against a pattern.
    pub fn matches(self, key: &str, pattern: &str) -> bool {
        match self {
            MatchMode::Exact => key == pattern,
            MatchMode::Prefix => key.starts_with(pattern),
            MatchMode::Suffix => key.ends_with(pattern),
            MatchMode::Contains => key.contains(pattern),
        }
    }
}

fn default_max_results() -> Option<u32> {
    Some(DEFAULT_MAX_RESULTS)
}

/// A key-pattern search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub set_name: String,
    #[serde(default, alias = "pattern")]
    pub search_pattern: String,
    #[serde(default, alias = "matchMode")]
    pub search_type: Option<MatchMode>,
    #[serde(default = "default_max_results")]
    pub max_results: Option<u32>,
}

impl SearchQuery {
    pub fn new(
        namespace: impl Into<String>,
        set_name: impl Into<String>,
        pattern: impl Into<String>,
        mode: MatchMode,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            set_name: set_name.into(),
            search_pattern: pattern.into(),
            search_type: Some(mode),
            max_results: default_max_results(),
        }
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Number of records the search may scan.
    pub fn scan_cap(&self) -> u64 {
        match self.max_results {
            Some(n) => u64::from(n).saturating_mul(OVERSCAN_FACTOR),
            None => DEFAULT_SCAN_CAP,
        }
    }

    /// Number of matches the search may return.
    pub fn result_limit(&self) -> usize {
        self.max_results.unwrap_or(DEFAULT_MAX_RESULTS) as usize
    }
}

/// Scans and searches over the live session.
pub struct ScanSearchEngine {
    connections: Arc<ConnectionManager>,
}

impl ScanSearchEngine {
    pub fn new(connections: Arc<ConnectionManager>) -> Self {
        Self { connections }
    }

    /// Returns up to `max_records` records of a namespace or set.
    ///
    /// `max_records == 0` returns every record. An empty `set_name` scans the
    /// whole namespace.
    pub fn scan(
        &self,
        namespace: &str,
        set_name: &str,
        max_records: u64,
    ) -> Result<Vec<RecordEnvelope>, CoreError> {
        let session = self.connections.require_session()?;
        let cap = usize::try_from(max_records).unwrap_or(usize::MAX);
        let mut records = Vec::new();

        session
            .client()
            .scan_all(
                &ScanPolicy::new(max_records),
                namespace,
                set_name,
                &mut |key, record| {
                    records.push(RecordEnvelope::from_record(
                        key,
                        key_value(key),
                        record.clone(),
                    ));
                    if cap > 0 && records.len() >= cap {
                        ScanControl::Stop
                    } else {
                        ScanControl::Continue
                    }
                },
            )
            .map_err(CoreError::operation("scan records"))?;

        session.record_operation();
        tracing::debug!(
            "Scanned {} records from {}.{}",
            records.len(),
            namespace,
            set_name
        );
        Ok(records)
    }

    /// Returns records whose key text matches the query.
    ///
    /// Stops scanning as soon as the result limit is reached.
    pub fn search(&self, query: &SearchQuery) -> Result<Vec<RecordEnvelope>, CoreError> {
        let session = self.connections.require_session()?;

        let limit = query.result_limit();
        let Some(mode) = query.search_type.filter(|_| limit > 0) else {
            return Ok(Vec::new());
        };

        let pattern = query.search_pattern.as_str();
        let mut matched = Vec::new();
        let mut scanned = 0u64;

        session
            .client()
            .scan_all(
                &ScanPolicy::new(query.scan_cap()),
                &query.namespace,
                &query.set_name,
                &mut |key, record| {
                    scanned += 1;
                    if mode.matches(&key_text(key), pattern) {
                        matched.push(RecordEnvelope::from_record(
                            key,
                            key_value(key),
                            record.clone(),
                        ));
                        if matched.len() >= limit {
                            return ScanControl::Stop;
                        }
                    }
                    ScanControl::Continue
                },
            )
            .map_err(CoreError::operation("search records"))?;

        session.record_operation();
        tracing::debug!(
            "Search {:?} '{}' in {}.{} matched {} of {} scanned",
            mode,
            pattern,
            query.namespace,
            query.set_name,
            matched.len(),
            scanned
        );
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordStore;
    use crate::testing::{cluster, connected_manager, FaultyCluster};
    use crate::value::BinValue;
    use std::collections::BTreeMap;

    fn seeded(keys: &[&str]) -> Arc<ConnectionManager> {
        let manager = Arc::new(connected_manager());
        let store = RecordStore::new(manager.clone());
        for key in keys {
            let mut bins = BTreeMap::new();
            bins.insert("k".to_string(), BinValue::from(*key));
            store
                .put(RecordEnvelope::new("test", "users", *key).with_bins(bins))
                .unwrap();
        }
        manager
    }

    fn search_keys(engine: &ScanSearchEngine, query: &SearchQuery) -> Vec<String> {
        let mut keys: Vec<String> = engine
            .search(query)
            .unwrap()
            .into_iter()
            .filter_map(|r| r.key.map(|k| k.to_string()))
            .collect();
        keys.sort();
        keys
    }

    #[test]
    fn test_match_modes() {
        assert!(MatchMode::Prefix.matches("user123", "user"));
        assert!(!MatchMode::Prefix.matches("xuser", "user"));
        assert!(MatchMode::Suffix.matches("xuser", "user"));
        assert!(!MatchMode::Suffix.matches("user123", "user"));
        assert!(MatchMode::Contains.matches("user123", "user"));
        assert!(MatchMode::Contains.matches("xuser", "user"));
        assert!(!MatchMode::Exact.matches("user123", "user"));
        assert!(!MatchMode::Exact.matches("xuser", "user"));
        assert!(MatchMode::Exact.matches("user", "user"));
    }

    #[test]
    fn test_search_by_mode() {
        let engine = ScanSearchEngine::new(seeded(&["user123", "xuser", "other"]));

        let prefix = SearchQuery::new("test", "users", "user", MatchMode::Prefix);
        assert_eq!(search_keys(&engine, &prefix), vec!["user123"]);

        let suffix = SearchQuery::new("test", "users", "user", MatchMode::Suffix);
        assert_eq!(search_keys(&engine, &suffix), vec!["xuser"]);

        let contains = SearchQuery::new("test", "users", "user", MatchMode::Contains);
        assert_eq!(search_keys(&engine, &contains), vec!["user123", "xuser"]);

        let exact = SearchQuery::new("test", "users", "user", MatchMode::Exact);
        assert!(search_keys(&engine, &exact).is_empty());
    }

    #[test]
    fn test_search_respects_max_results() {
        let keys: Vec<String> = (0..20).map(|i| format!("user{}", i)).collect();
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let engine = ScanSearchEngine::new(seeded(&refs));

        let query = SearchQuery::new("test", "users", "user", MatchMode::Prefix).with_max_results(5);
        assert_eq!(engine.search(&query).unwrap().len(), 5);
    }

    #[test]
    fn test_search_zero_results_and_unset_mode() {
        let engine = ScanSearchEngine::new(seeded(&["user1"]));

        let zero = SearchQuery::new("test", "users", "user", MatchMode::Prefix).with_max_results(0);
        assert!(engine.search(&zero).unwrap().is_empty());

        let mut unset = SearchQuery::new("test", "users", "user", MatchMode::Prefix);
        unset.search_type = None;
        assert!(engine.search(&unset).unwrap().is_empty());
    }

    #[test]
    fn test_search_requires_session_even_without_mode() {
        let engine = ScanSearchEngine::new(Arc::new(ConnectionManager::new(Arc::new(cluster()))));
        let mut query = SearchQuery::new("test", "users", "u", MatchMode::Exact);
        query.search_type = None;
        assert!(matches!(engine.search(&query), Err(CoreError::NotConnected)));
    }

    #[test]
    fn test_scan_caps_and_unbounded() {
        let engine = ScanSearchEngine::new(seeded(&["a", "b", "c", "d"]));
        assert_eq!(engine.scan("test", "users", 2).unwrap().len(), 2);
        assert_eq!(engine.scan("test", "users", 0).unwrap().len(), 4);
        assert_eq!(engine.scan("test", "", 0).unwrap().len(), 4);
        assert!(engine.scan("test", "empty", 0).unwrap().is_empty());
    }

    #[test]
    fn test_scan_projects_envelopes() {
        let engine = ScanSearchEngine::new(seeded(&["alice"]));
        let records = engine.scan("test", "users", 10).unwrap();
        let record = &records[0];
        assert_eq!(record.namespace, "test");
        assert_eq!(record.set_name, "users");
        assert_eq!(record.key, Some(BinValue::from("alice")));
        assert_eq!(record.generation, Some(1));
        assert_eq!(record.ttl, Some(-1));
        assert_eq!(
            record.bins.as_ref().and_then(|b| b.get("k")),
            Some(&BinValue::from("alice"))
        );
    }

    #[test]
    fn test_scan_reports_digest_for_keyless_records() {
        let manager = Arc::new(connected_manager());
        let store = RecordStore::new(manager.clone()).with_send_key(false);
        let mut bins = BTreeMap::new();
        bins.insert("a".to_string(), BinValue::Int(1));
        store
            .put(RecordEnvelope::new("test", "anon", "hidden").with_bins(bins))
            .unwrap();

        let engine = ScanSearchEngine::new(manager);
        let records = engine.scan("test", "anon", 0).unwrap();
        let key = records[0].key.as_ref().and_then(BinValue::as_str).unwrap();
        assert!(key.starts_with('[') && key.ends_with(']'));

        let query = SearchQuery::new("test", "anon", "hidden", MatchMode::Contains);
        assert!(engine.search(&query).unwrap().is_empty());
    }

    #[test]
    fn test_scan_failure_is_wrapped() {
        let engine = ScanSearchEngine::new(Arc::new(connected_manager()));
        let err = engine.scan("missing", "users", 0).unwrap_err();
        assert!(err.to_string().starts_with("Failed to scan records"));

        let engine = ScanSearchEngine::new(Arc::new(FaultyCluster::new().fail_scans().connected()));
        let query = SearchQuery::new("test", "users", "u", MatchMode::Prefix);
        assert!(matches!(
            engine.search(&query),
            Err(CoreError::Operation {
                context: "search records",
                ..
            })
        ));
    }

    #[test]
    fn test_requires_session() {
        let engine = ScanSearchEngine::new(Arc::new(ConnectionManager::new(Arc::new(cluster()))));
        assert!(matches!(
            engine.scan("test", "users", 10),
            Err(CoreError::NotConnected)
        ));
    }

    #[test]
    fn test_query_json() {
        let query: SearchQuery = serde_json::from_str(
            r#"{"namespace":"test","setName":"users","searchPattern":"u","searchType":"PREFIX"}"#,
        )
        .unwrap();
        assert_eq!(query.search_type, Some(MatchMode::Prefix));
        assert_eq!(query.max_results, Some(100));
        assert_eq!(query.scan_cap(), 1000);

        let aliased: SearchQuery =
            serde_json::from_str(r#"{"pattern":"u","matchMode":"contains","maxResults":null}"#)
                .unwrap();
        assert_eq!(aliased.search_pattern, "u");
        assert_eq!(aliased.search_type, Some(MatchMode::Contains));
        assert_eq!(aliased.scan_cap(), DEFAULT_SCAN_CAP);
        assert_eq!(aliased.result_limit(), 100);
    }

    #[test]
    fn test_scan_cap_saturates() {
        let query = SearchQuery::new("t", "s", "p", MatchMode::Exact).with_max_results(u32::MAX);
        assert_eq!(query.scan_cap(), u64::from(u32::MAX) * 10);
        let query = query.with_max_results(7);
        assert_eq!(query.scan_cap(), 70);
    }
}
