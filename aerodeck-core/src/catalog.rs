//! Namespace and set listing.
//!
//! Both listings talk to the first member node only. The node choice is
//! arbitrary but stable for a given membership.

use crate::connection::ConnectionManager;
use crate::error::CoreError;
use aerodeck_info::{parse_info, parse_info_list, split_names, InfoCommand, InfoRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Namespace statistics and configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceDescriptor {
    pub name: String,
    pub master_objects: Option<i64>,
    pub replication_factor: Option<i64>,
    pub storage_engine: Option<String>,
    /// Every pair reported by `namespace/<name>`.
    pub config: BTreeMap<String, String>,
}

impl NamespaceDescriptor {
    /// Builds a descriptor from a parsed `namespace/<name>` response.
    pub fn from_info(name: impl Into<String>, info: InfoRecord) -> Self {
        Self {
            name: name.into(),
            master_objects: info.get_i64("master-objects"),
            replication_factor: info.get_i64("replication-factor"),
            storage_engine: info.get("storage-engine").map(str::to_string),
            config: info.into_map(),
        }
    }
}

/// Per-set statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDescriptor {
    pub namespace: String,
    pub set_name: String,
    pub object_count: Option<i64>,
    pub memory_data_bytes: Option<i64>,
}

impl SetDescriptor {
    /// Builds a descriptor from one `sets/<ns>` segment.
    ///
    /// Returns `None` when the segment has no `set` key.
    pub fn from_info(namespace: &str, info: &InfoRecord) -> Option<Self> {
        let set_name = info.get("set")?;
        Some(Self {
            namespace: namespace.to_string(),
            set_name: set_name.to_string(),
            object_count: info.get_i64("objects"),
            memory_data_bytes: info
                .get_i64("memory_data_bytes")
                .or_else(|| info.get_i64("data_used_bytes")),
        })
    }
}

/// Lists namespaces and sets through info commands.
pub struct CatalogService {
    connections: Arc<ConnectionManager>,
}

impl CatalogService {
    pub fn new(connections: Arc<ConnectionManager>) -> Self {
        Self { connections }
    }

    /// Lists every namespace with its statistics.
    ///
    /// A failing info command fails the whole listing.
    pub fn list_namespaces(&self) -> Result<Vec<NamespaceDescriptor>, CoreError> {
        let session = self.connections.require_session()?;
        let client = session.client();
        let Some(node) = client.nodes().into_iter().next() else {
            return Ok(Vec::new());
        };

        let names = client
            .info(&node, &InfoCommand::Namespaces.to_string())
            .map_err(CoreError::operation("get namespaces"))?;

        let mut namespaces = Vec::new();
        for name in split_names(&names) {
            let command = InfoCommand::Namespace(name.clone()).to_string();
            let response = client
                .info(&node, &command)
                .map_err(CoreError::operation("get namespaces"))?;
            namespaces.push(NamespaceDescriptor::from_info(name, parse_info(&response)));
        }

        session.record_operation();
        tracing::debug!("Listed {} namespaces from {}", namespaces.len(), node.name);
        Ok(namespaces)
    }

    /// Lists the sets of a namespace.
    pub fn list_sets(&self, namespace: &str) -> Result<Vec<SetDescriptor>, CoreError> {
        let session = self.connections.require_session()?;
        let client = session.client();
        let Some(node) = client.nodes().into_iter().next() else {
            return Ok(Vec::new());
        };

        let response = client
            .info(&node, &InfoCommand::Sets(namespace.to_string()).to_string())
            .map_err(CoreError::operation("get sets"))?;

        let sets: Vec<SetDescriptor> = parse_info_list(&response)
            .iter()
            .filter_map(|segment| SetDescriptor::from_info(namespace, segment))
            .collect();

        session.record_operation();
        tracing::debug!("Listed {} sets in namespace {}", sets.len(), namespace);
        Ok(sets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RecordEnvelope, RecordStore};
    use crate::testing::{cluster, connected_manager, FaultyCluster};
    use crate::value::BinValue;

    fn seed(manager: &Arc<ConnectionManager>, set: &str, key: &str) {
        let store = RecordStore::new(manager.clone());
        let mut bins = BTreeMap::new();
        bins.insert("name".to_string(), BinValue::from("abc"));
        store
            .put(RecordEnvelope::new("test", set, key).with_bins(bins))
            .unwrap();
    }

    #[test]
    fn test_list_namespaces() {
        let manager = Arc::new(connected_manager());
        seed(&manager, "demo", "k1");
        seed(&manager, "demo", "k2");

        let namespaces = CatalogService::new(manager).list_namespaces().unwrap();
        let names: Vec<_> = namespaces.iter().map(|ns| ns.name.as_str()).collect();
        assert_eq!(names, vec!["test", "bar"]);

        let test = &namespaces[0];
        assert_eq!(test.master_objects, Some(2));
        assert_eq!(test.replication_factor, Some(2));
        assert_eq!(test.storage_engine.as_deref(), Some("memory"));
        assert_eq!(test.config.get("objects").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_list_sets() {
        let manager = Arc::new(connected_manager());
        seed(&manager, "demo", "k1");
        seed(&manager, "users", "u1");
        seed(&manager, "users", "u2");

        let sets = CatalogService::new(manager).list_sets("test").unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].set_name, "demo");
        assert_eq!(sets[1].set_name, "users");
        assert_eq!(sets[1].object_count, Some(2));
        assert_eq!(sets[1].namespace, "test");
        assert!(sets[0].memory_data_bytes.unwrap_or_default() > 0);
    }

    #[test]
    fn test_list_sets_empty_namespace() {
        let manager = Arc::new(connected_manager());
        let sets = CatalogService::new(manager).list_sets("bar").unwrap();
        assert!(sets.is_empty());
    }

    #[test]
    fn test_list_sets_unknown_namespace_fails() {
        let manager = Arc::new(connected_manager());
        let err = CatalogService::new(manager).list_sets("nope").unwrap_err();
        assert!(err.to_string().starts_with("Failed to get sets"));
    }

    #[test]
    fn test_requires_session() {
        let catalog = CatalogService::new(Arc::new(ConnectionManager::new(Arc::new(cluster()))));
        assert!(matches!(
            catalog.list_namespaces(),
            Err(CoreError::NotConnected)
        ));
        assert!(matches!(catalog.list_sets("test"), Err(CoreError::NotConnected)));
    }

    #[test]
    fn test_info_failure_aborts_listing() {
        let catalog = CatalogService::new(Arc::new(
            FaultyCluster::new().fail_info("namespace/bar").connected(),
        ));
        let err = catalog.list_namespaces().unwrap_err();
        assert!(matches!(
            err,
            CoreError::Operation {
                context: "get namespaces",
                ..
            }
        ));
    }

    #[test]
    fn test_no_nodes_lists_nothing() {
        let catalog = CatalogService::new(Arc::new(FaultyCluster::new().without_nodes().connected()));
        assert!(catalog.list_namespaces().unwrap().is_empty());
        assert!(catalog.list_sets("test").unwrap().is_empty());
    }

    #[test]
    fn test_set_descriptor_parsing() {
        let segment = parse_info("ns=test:set=demo:objects=x:data_used_bytes=128");
        let set = SetDescriptor::from_info("test", &segment).unwrap();
        assert_eq!(set.object_count, None);
        assert_eq!(set.memory_data_bytes, Some(128));

        assert!(SetDescriptor::from_info("test", &parse_info("ns=test:objects=1")).is_none());
    }

    #[test]
    fn test_namespace_descriptor_tolerates_bad_numbers() {
        let info = parse_info("master-objects=lots:replication-factor=2");
        let ns = NamespaceDescriptor::from_info("test", info);
        assert_eq!(ns.master_objects, None);
        assert_eq!(ns.replication_factor, Some(2));
        assert_eq!(ns.storage_engine, None);
    }
}
