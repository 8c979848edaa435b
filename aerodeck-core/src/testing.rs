//! Shared test fixtures.

use crate::connection::{ConnectRequest, ConnectionManager};
use aerodeck_cluster::{
    Bins, ClientConfig, ClusterClient, ClusterError, Connector, Key, MemoryCluster, Node, Record,
    ScanControl, ScanPolicy, WritePolicy,
};
use std::sync::Arc;
use std::time::Duration;

pub(crate) fn cluster() -> MemoryCluster {
    MemoryCluster::default()
}

/// A manager connected to a fresh default cluster.
pub(crate) fn connected_manager() -> ConnectionManager {
    let manager = ConnectionManager::new(Arc::new(cluster()));
    let status = manager.connect(&ConnectRequest::new("localhost", 3000));
    assert!(status.connected, "{}", status.message);
    manager
}

/// A memory cluster with injected faults.
#[derive(Clone, Default)]
pub(crate) struct FaultyCluster {
    inner: MemoryCluster,
    failing_info: Vec<String>,
    fail_scans: bool,
    no_nodes: bool,
    connect_delay: Option<Duration>,
}

impl FaultyCluster {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fails the given info command.
    pub(crate) fn fail_info(mut self, command: &str) -> Self {
        self.failing_info.push(command.to_string());
        self
    }

    pub(crate) fn fail_scans(mut self) -> Self {
        self.fail_scans = true;
        self
    }

    /// Reports an empty member list.
    pub(crate) fn without_nodes(mut self) -> Self {
        self.no_nodes = true;
        self
    }

    /// Sleeps for `delay` inside every connect.
    pub(crate) fn delay_connect(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    pub(crate) fn connected(self) -> ConnectionManager {
        let manager = ConnectionManager::new(Arc::new(self));
        let status = manager.connect(&ConnectRequest::new("localhost", 3000));
        assert!(status.connected, "{}", status.message);
        manager
    }
}

impl Connector for FaultyCluster {
    fn connect(&self, config: &ClientConfig) -> Result<Box<dyn ClusterClient>, ClusterError> {
        if let Some(delay) = self.connect_delay {
            std::thread::sleep(delay);
        }
        Ok(Box::new(FaultyClient {
            inner: self.inner.connect(config)?,
            faults: self.clone(),
        }))
    }
}

struct FaultyClient {
    inner: Box<dyn ClusterClient>,
    faults: FaultyCluster,
}

impl ClusterClient for FaultyClient {
    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    fn nodes(&self) -> Vec<Node> {
        if self.faults.no_nodes {
            Vec::new()
        } else {
            self.inner.nodes()
        }
    }

    fn info(&self, node: &Node, command: &str) -> Result<String, ClusterError> {
        if self.faults.failing_info.iter().any(|c| c == command) {
            return Err(ClusterError::Info(format!("{} timed out", command)));
        }
        self.inner.info(node, command)
    }

    fn get(&self, key: &Key) -> Result<Option<Record>, ClusterError> {
        self.inner.get(key)
    }

    fn put(&self, policy: &WritePolicy, key: &Key, bins: &Bins) -> Result<(), ClusterError> {
        self.inner.put(policy, key, bins)
    }

    fn delete(&self, key: &Key) -> Result<bool, ClusterError> {
        self.inner.delete(key)
    }

    fn scan_all(
        &self,
        policy: &ScanPolicy,
        namespace: &str,
        set_name: &str,
        callback: &mut dyn FnMut(&Key, &Record) -> ScanControl,
    ) -> Result<(), ClusterError> {
        if self.faults.fail_scans {
            return Err(ClusterError::Timeout);
        }
        self.inner.scan_all(policy, namespace, set_name, callback)
    }

    fn close(&self) {
        self.inner.close();
    }
}
