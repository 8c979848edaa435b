//! Client traits and connection configuration.

use crate::error::ClusterError;
use crate::key::Key;
use crate::policy::{ScanControl, ScanPolicy, WritePolicy};
use crate::record::{Bins, Record};
use std::fmt;
use std::time::Duration;

/// Username/password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Seed host.
    pub host: String,
    /// Seed port.
    pub port: u16,
    /// Optional credentials.
    pub credentials: Option<Credentials>,
    /// Connection timeout.
    pub connect_timeout: Duration,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            credentials: None,
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Returns `host:port`.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A cluster member node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub address: String,
    pub active: bool,
}

/// An established connection to a cluster.
///
/// Implementations are blocking; async callers should move calls onto a
/// blocking thread.
pub trait ClusterClient: Send + Sync {
    /// Returns whether the client is still connected.
    fn is_connected(&self) -> bool;

    /// Returns the current cluster members.
    fn nodes(&self) -> Vec<Node>;

    /// Issues an info command against one node and returns the raw response.
    fn info(&self, node: &Node, command: &str) -> Result<String, ClusterError>;

    /// Reads a record. Returns `Ok(None)` when it does not exist.
    fn get(&self, key: &Key) -> Result<Option<Record>, ClusterError>;

    /// Writes bins to a record, creating it if needed.
    fn put(&self, policy: &WritePolicy, key: &Key, bins: &Bins) -> Result<(), ClusterError>;

    /// Deletes a record. Returns whether it existed.
    fn delete(&self, key: &Key) -> Result<bool, ClusterError>;

    /// Scans a namespace/set, invoking `callback` for every record on the
    /// calling thread until the scan is exhausted, the policy cap is reached,
    /// or the callback returns [`ScanControl::Stop`]. An empty set name scans
    /// the whole namespace.
    fn scan_all(
        &self,
        policy: &ScanPolicy,
        namespace: &str,
        set_name: &str,
        callback: &mut dyn FnMut(&Key, &Record) -> ScanControl,
    ) -> Result<(), ClusterError>;

    /// Closes the client. Safe to call more than once.
    fn close(&self);
}

/// Opens cluster connections.
pub trait Connector: Send + Sync {
    fn connect(&self, config: &ClientConfig) -> Result<Box<dyn ClusterClient>, ClusterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::new("localhost", 3000);
        assert_eq!(config.endpoint(), "localhost:3000");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.credentials.is_none());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("admin", "s3cret");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("admin"));
        assert!(!debug.contains("s3cret"));
    }
}
