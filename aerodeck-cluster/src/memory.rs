//! In-process cluster backend.
//!
//! `MemoryCluster` behaves like a small cluster reachable through a fixed set
//! of seed endpoints. Every client connected to the same `MemoryCluster`
//! shares its records. Info commands are answered in the cluster's textual
//! format so callers exercise the same parsing path as against real nodes.

use crate::client::{ClientConfig, ClusterClient, Connector, Node};
use crate::error::ClusterError;
use crate::key::{Key, UserKey, DIGEST_SIZE};
use crate::policy::{ScanControl, ScanPolicy, WritePolicy, TTL_DONT_UPDATE, TTL_NEVER_EXPIRE};
use crate::record::{now_cluster_secs, Bins, Record};
use aerodeck_info::InfoCommand;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Maximum bin name length in bytes.
pub const MAX_BIN_NAME_LEN: usize = 15;

/// Fixed per-record overhead counted in set memory statistics.
const RECORD_OVERHEAD_BYTES: u64 = 64;

/// In-memory cluster definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryClusterConfig {
    /// Value of the `cluster-name` info command.
    pub cluster_name: String,
    /// Value of the `build` info command.
    pub build: String,
    /// Endpoints (`host:port`) that accept connections.
    pub seeds: Vec<String>,
    /// Member nodes.
    pub nodes: Vec<MemoryNodeConfig>,
    /// Users; when empty, security is disabled and any credentials are accepted.
    pub users: Vec<MemoryUser>,
    /// Namespaces.
    pub namespaces: Vec<MemoryNamespaceConfig>,
}

impl Default for MemoryClusterConfig {
    fn default() -> Self {
        Self {
            cluster_name: "aerodeck".to_string(),
            build: "7.0.0".to_string(),
            seeds: vec!["127.0.0.1:3000".to_string(), "localhost:3000".to_string()],
            nodes: vec![MemoryNodeConfig {
                name: "BB9020011AC4202".to_string(),
                address: "127.0.0.1:3000".to_string(),
                active: true,
            }],
            users: Vec::new(),
            namespaces: vec![
                MemoryNamespaceConfig::default(),
                MemoryNamespaceConfig {
                    name: "bar".to_string(),
                    replication_factor: 1,
                    ..Default::default()
                },
            ],
        }
    }
}

/// A member node definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryNodeConfig {
    pub name: String,
    pub address: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// A user allowed to connect.
#[derive(Clone, Serialize, Deserialize)]
pub struct MemoryUser {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for MemoryUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryUser")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// A namespace definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryNamespaceConfig {
    pub name: String,
    pub replication_factor: u32,
    /// Default record lifetime in seconds (0 = never expire).
    pub default_ttl: u32,
    pub storage_engine: String,
}

impl Default for MemoryNamespaceConfig {
    fn default() -> Self {
        Self {
            name: "test".to_string(),
            replication_factor: 2,
            default_ttl: 0,
            storage_engine: "memory".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredRecord {
    user_key: Option<UserKey>,
    record: Record,
}

type SetId = (String, String);
type SetRecords = BTreeMap<[u8; DIGEST_SIZE], StoredRecord>;

struct ClusterState {
    config: MemoryClusterConfig,
    sets: DashMap<SetId, SetRecords>,
}

impl ClusterState {
    fn namespace(&self, name: &str) -> Result<&MemoryNamespaceConfig, ClusterError> {
        self.config
            .namespaces
            .iter()
            .find(|ns| ns.name == name)
            .ok_or_else(|| ClusterError::Server(format!("namespace not found: {}", name)))
    }

    /// Set names of a namespace in sorted order.
    fn set_names(&self, namespace: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .sets
            .iter()
            .filter(|entry| entry.key().0 == namespace)
            .map(|entry| entry.key().1.clone())
            .collect();
        names.sort();
        names
    }

    /// Copies the live records of a namespace (or one of its sets).
    fn live_records(&self, namespace: &str, set_name: &str, now: u32) -> Vec<(Key, Record)> {
        let set_names = if set_name.is_empty() {
            self.set_names(namespace)
        } else {
            vec![set_name.to_string()]
        };

        let mut out = Vec::new();
        for set in set_names {
            let Some(records) = self.sets.get(&(namespace.to_string(), set.clone())) else {
                continue;
            };
            for (digest, stored) in records.iter() {
                if stored.record.is_expired_at(now) {
                    continue;
                }
                let key = Key {
                    namespace: namespace.to_string(),
                    set_name: set.clone(),
                    user_key: stored.user_key.clone(),
                    digest: *digest,
                };
                out.push((key, stored.record.clone()));
            }
        }
        out
    }

    fn namespace_info(&self, ns: &MemoryNamespaceConfig) -> String {
        let now = now_cluster_secs();
        let objects = self.live_records(&ns.name, "", now).len();
        let effective_rf = ns
            .replication_factor
            .min(self.config.nodes.len() as u32)
            .max(1);
        format!(
            "objects={}:master-objects={}:prole-objects={}:replication-factor={}:\
             effective_replication_factor={}:storage-engine={}:default-ttl={}:sets={}",
            objects,
            objects,
            objects * (effective_rf as usize - 1),
            ns.replication_factor,
            effective_rf,
            ns.storage_engine,
            ns.default_ttl,
            self.set_names(&ns.name).len(),
        )
    }

    fn sets_info(&self, namespace: &str) -> String {
        let now = now_cluster_secs();
        let mut out = String::new();
        for set in self.set_names(namespace) {
            let live = self.live_records(namespace, &set, now);
            let bytes: u64 = live
                .iter()
                .map(|(_, record)| {
                    RECORD_OVERHEAD_BYTES
                        + record
                            .bins
                            .iter()
                            .map(|(name, value)| name.len() as u64 + value.estimated_size())
                            .sum::<u64>()
                })
                .sum();
            out.push_str(&format!(
                "ns={}:set={}:objects={}:tombstones=0:memory_data_bytes={}:\
                 truncate_lut=0:stop-writes-count=0:disable-eviction=false;",
                namespace,
                set,
                live.len(),
                bytes
            ));
        }
        out
    }
}

/// An in-process cluster; also the [`Connector`] that opens clients to it.
#[derive(Clone)]
pub struct MemoryCluster {
    state: Arc<ClusterState>,
}

impl MemoryCluster {
    /// Creates an empty cluster from its definition.
    pub fn new(config: MemoryClusterConfig) -> Self {
        Self {
            state: Arc::new(ClusterState {
                config,
                sets: DashMap::new(),
            }),
        }
    }

    /// Returns the cluster definition.
    pub fn config(&self) -> &MemoryClusterConfig {
        &self.state.config
    }

    /// Returns the number of live records in a namespace.
    pub fn record_count(&self, namespace: &str) -> usize {
        self.state
            .live_records(namespace, "", now_cluster_secs())
            .len()
    }

    fn accepts_seed(&self, config: &ClientConfig) -> bool {
        let endpoint = config.endpoint().to_lowercase();
        self.state
            .config
            .seeds
            .iter()
            .any(|seed| seed.to_lowercase() == endpoint)
    }

    fn authenticate(&self, config: &ClientConfig) -> Result<(), ClusterError> {
        let users = &self.state.config.users;
        if users.is_empty() {
            return Ok(());
        }
        let creds = config
            .credentials
            .as_ref()
            .ok_or_else(|| ClusterError::Auth("credentials required".to_string()))?;
        if users
            .iter()
            .any(|u| u.username == creds.username && u.password == creds.password)
        {
            Ok(())
        } else {
            Err(ClusterError::Auth("invalid user or password".to_string()))
        }
    }
}

impl Default for MemoryCluster {
    fn default() -> Self {
        Self::new(MemoryClusterConfig::default())
    }
}

impl Connector for MemoryCluster {
    fn connect(&self, config: &ClientConfig) -> Result<Box<dyn ClusterClient>, ClusterError> {
        let endpoint = config.endpoint();
        tracing::debug!("Connecting to memory cluster at {}", endpoint);

        if !self.accepts_seed(config) {
            return Err(ClusterError::Connection(format!(
                "Failed to connect to host(s): {}: connection refused",
                endpoint
            )));
        }
        if self.state.config.nodes.is_empty() {
            return Err(ClusterError::Connection(format!(
                "Failed to connect to host(s): {}: cluster has no nodes",
                endpoint
            )));
        }
        self.authenticate(config)?;

        Ok(Box::new(MemoryClient {
            state: self.state.clone(),
            connected: AtomicBool::new(true),
            endpoint,
        }))
    }
}

/// A client connected to a [`MemoryCluster`].
struct MemoryClient {
    state: Arc<ClusterState>,
    connected: AtomicBool,
    endpoint: String,
}

impl MemoryClient {
    fn ensure_open(&self) -> Result<(), ClusterError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ClusterError::Closed)
        }
    }
}

/// Resolves a write policy expiration into an absolute expiration.
fn resolve_expiration(
    requested: i32,
    default_ttl: u32,
    current: Option<u32>,
    now: u32,
) -> Result<u32, ClusterError> {
    let from_ttl = |ttl: u32| if ttl == 0 { 0 } else { now.saturating_add(ttl) };
    match requested {
        TTL_DONT_UPDATE => Ok(current.unwrap_or_else(|| from_ttl(default_ttl))),
        TTL_NEVER_EXPIRE => Ok(0),
        0 => Ok(from_ttl(default_ttl)),
        n if n > 0 => Ok(from_ttl(n as u32)),
        n => Err(ClusterError::InvalidArgument(format!(
            "invalid expiration: {}",
            n
        ))),
    }
}

impl ClusterClient for MemoryClient {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn nodes(&self) -> Vec<Node> {
        if !self.is_connected() {
            return Vec::new();
        }
        self.state
            .config
            .nodes
            .iter()
            .map(|n| Node {
                name: n.name.clone(),
                address: n.address.clone(),
                active: n.active,
            })
            .collect()
    }

    fn info(&self, node: &Node, command: &str) -> Result<String, ClusterError> {
        self.ensure_open()?;
        if !self.state.config.nodes.iter().any(|n| n.name == node.name) {
            return Err(ClusterError::InvalidArgument(format!(
                "unknown node: {}",
                node.name
            )));
        }

        tracing::debug!("info {} -> {}", node.name, command);
        let response = match command.parse::<InfoCommand>()? {
            InfoCommand::Namespaces => self
                .state
                .config
                .namespaces
                .iter()
                .map(|ns| ns.name.as_str())
                .collect::<Vec<_>>()
                .join(";"),
            InfoCommand::Namespace(name) => {
                let ns = self.state.namespace(&name)?;
                self.state.namespace_info(ns)
            }
            InfoCommand::Sets(name) => {
                self.state.namespace(&name)?;
                self.state.sets_info(&name)
            }
            InfoCommand::Node => node.name.clone(),
            InfoCommand::Build => self.state.config.build.clone(),
            InfoCommand::ClusterName => self.state.config.cluster_name.clone(),
        };
        Ok(response)
    }

    fn get(&self, key: &Key) -> Result<Option<Record>, ClusterError> {
        self.ensure_open()?;
        self.state.namespace(&key.namespace)?;

        let now = now_cluster_secs();
        let set_id = (key.namespace.clone(), key.set_name.clone());
        let mut expired = false;
        let found = match self.state.sets.get(&set_id) {
            Some(records) => match records.get(&key.digest) {
                Some(stored) if stored.record.is_expired_at(now) => {
                    expired = true;
                    None
                }
                Some(stored) => Some(stored.record.clone()),
                None => None,
            },
            None => None,
        };

        if expired {
            if let Some(mut records) = self.state.sets.get_mut(&set_id) {
                records.remove(&key.digest);
            }
        }
        Ok(found)
    }

    fn put(&self, policy: &WritePolicy, key: &Key, bins: &Bins) -> Result<(), ClusterError> {
        self.ensure_open()?;
        let default_ttl = self.state.namespace(&key.namespace)?.default_ttl;
        if let Some(name) = bins.keys().find(|name| name.len() > MAX_BIN_NAME_LEN) {
            return Err(ClusterError::InvalidArgument(format!(
                "bin name too long (max {} bytes): {}",
                MAX_BIN_NAME_LEN, name
            )));
        }

        let now = now_cluster_secs();
        let mut records = self
            .state
            .sets
            .entry((key.namespace.clone(), key.set_name.clone()))
            .or_default();

        let existing = records
            .get(&key.digest)
            .filter(|stored| !stored.record.is_expired_at(now))
            .cloned();
        let (mut merged, generation, current_expiration, stored_key) = match existing {
            Some(stored) => (
                stored.record.bins,
                stored.record.generation.saturating_add(1),
                Some(stored.record.expiration),
                stored.user_key,
            ),
            None => (Bins::new(), 1, None, None),
        };

        for (name, value) in bins {
            if value.is_nil() {
                merged.remove(name);
            } else {
                merged.insert(name.clone(), value.clone());
            }
        }

        let expiration =
            resolve_expiration(policy.expiration, default_ttl, current_expiration, now)?;

        // A record left without bins no longer exists.
        if merged.is_empty() {
            records.remove(&key.digest);
            return Ok(());
        }

        let user_key = if policy.send_key {
            key.user_key.clone()
        } else {
            stored_key
        };
        records.insert(
            key.digest,
            StoredRecord {
                user_key,
                record: Record::new(merged, generation, expiration),
            },
        );
        Ok(())
    }

    fn delete(&self, key: &Key) -> Result<bool, ClusterError> {
        self.ensure_open()?;
        self.state.namespace(&key.namespace)?;

        let now = now_cluster_secs();
        let removed = self
            .state
            .sets
            .get_mut(&(key.namespace.clone(), key.set_name.clone()))
            .and_then(|mut records| records.remove(&key.digest));
        Ok(removed.is_some_and(|stored| !stored.record.is_expired_at(now)))
    }

    fn scan_all(
        &self,
        policy: &ScanPolicy,
        namespace: &str,
        set_name: &str,
        callback: &mut dyn FnMut(&Key, &Record) -> ScanControl,
    ) -> Result<(), ClusterError> {
        self.ensure_open()?;
        self.state.namespace(namespace)?;

        // Callbacks run without holding any map locks.
        let snapshot = self
            .state
            .live_records(namespace, set_name, now_cluster_secs());

        let mut delivered = 0u64;
        for (key, record) in &snapshot {
            if policy.max_records > 0 && delivered >= policy.max_records {
                break;
            }
            delivered += 1;
            if callback(key, record) == ScanControl::Stop {
                break;
            }
        }

        tracing::debug!(
            "Scan of {}.{} delivered {} of {} records",
            namespace,
            set_name,
            delivered,
            snapshot.len()
        );
        Ok(())
    }

    fn close(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            tracing::debug!("Closed memory cluster client for {}", self.endpoint);
        }
    }
}
