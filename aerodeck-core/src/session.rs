//! Cluster session.

use aerodeck_cluster::ClusterClient;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// An established cluster connection and where it came from.
///
/// The client is closed when the session is dropped.
pub struct Session {
    /// Unique session ID.
    id: String,

    /// Connected cluster client.
    client: Box<dyn ClusterClient>,

    /// Seed host used to connect.
    host: String,

    /// Seed port used to connect.
    port: u16,

    /// Username, if credentials were supplied.
    username: Option<String>,

    /// Session creation time.
    connected_at: Instant,

    /// Completed data operations.
    operation_count: AtomicU64,
}

impl Session {
    /// Creates a session around a connected client.
    pub fn new(
        client: Box<dyn ClusterClient>,
        host: impl Into<String>,
        port: u16,
        username: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            client,
            host: host.into(),
            port,
            username,
            connected_at: Instant::now(),
            operation_count: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the cluster client.
    pub fn client(&self) -> &dyn ClusterClient {
        self.client.as_ref()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Returns whether the underlying client is still connected.
    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    /// Returns the session age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Records a completed data operation.
    pub fn record_operation(&self) {
        self.operation_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of completed data operations.
    pub fn operation_count(&self) -> u64 {
        self.operation_count.load(Ordering::Relaxed)
    }

    /// Closes the underlying client.
    pub fn close(&self) {
        self.client.close();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.client.close();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aerodeck_cluster::{ClientConfig, Connector, MemoryCluster};

    fn session() -> Session {
        let client = MemoryCluster::default()
            .connect(&ClientConfig::new("localhost", 3000))
            .unwrap();
        Session::new(client, "localhost", 3000, Some("admin".to_string()))
    }

    #[test]
    fn test_session_creation() {
        let session = session();
        assert!(session.is_connected());
        assert_eq!(session.host(), "localhost");
        assert_eq!(session.port(), 3000);
        assert_eq!(session.username(), Some("admin"));
        assert_eq!(session.id().len(), 36);
    }

    #[test]
    fn test_session_close() {
        let session = session();
        session.close();
        assert!(!session.is_connected());
    }

    #[test]
    fn test_operation_count() {
        let session = session();
        session.record_operation();
        session.record_operation();
        assert_eq!(session.operation_count(), 2);
    }
}
