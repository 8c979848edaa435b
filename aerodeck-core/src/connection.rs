//! Cluster connection lifecycle.
//!
//! `ConnectionManager` owns the only live [`Session`]. Data operations hold a
//! read guard on the session slot for as long as they run, while `connect` and
//! `disconnect` take the write guard, so a session is never closed or replaced
//! underneath an in-flight scan.

use crate::error::CoreError;
use crate::session::Session;
use aerodeck_cluster::{ClientConfig, Connector, Credentials, Node, DEFAULT_PORT};
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Cluster name reported when the cluster returns no member nodes.
pub const DEFAULT_CLUSTER_NAME: &str = "Aerospike Cluster";

/// Cluster name reported when the derived name is empty.
pub const UNKNOWN_CLUSTER_NAME: &str = "Unknown";

/// Read access to the live session.
pub type SessionGuard<'a> = MappedRwLockReadGuard<'a, Session>;

/// Connection parameters supplied by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

impl ConnectRequest {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: Some(host.into()),
            port: Some(port),
            ..Default::default()
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

/// A cluster member as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    pub address: String,
    pub active: bool,
}

impl From<Node> for NodeInfo {
    fn from(node: Node) -> Self {
        Self {
            name: node.name,
            address: node.address,
            active: node.active,
        }
    }
}

/// Connection state as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub connected: bool,
    pub cluster_name: Option<String>,
    pub nodes: Vec<NodeInfo>,
    pub message: String,
}

impl ConnectionStatus {
    /// A disconnected status carrying a message.
    pub fn disconnected(message: impl Into<String>) -> Self {
        Self {
            connected: false,
            cluster_name: None,
            nodes: Vec::new(),
            message: message.into(),
        }
    }
}

/// Defaults applied to connect requests.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Host used when a request omits it.
    pub default_host: String,
    /// Port used when a request omits it.
    pub default_port: u16,
    /// Connection timeout passed to the connector.
    pub connect_timeout: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            default_host: "localhost".to_string(),
            default_port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Derives the cluster name from the first member node.
///
/// The name is the node name up to its first `:`.
pub fn derive_cluster_name(nodes: &[Node]) -> String {
    let Some(first) = nodes.first() else {
        return DEFAULT_CLUSTER_NAME.to_string();
    };
    let name = first.name.split(':').next().unwrap_or_default();
    if name.is_empty() {
        UNKNOWN_CLUSTER_NAME.to_string()
    } else {
        name.to_string()
    }
}

/// Owns the single live cluster session.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    settings: ConnectionSettings,
    session: RwLock<Option<Session>>,
}

impl ConnectionManager {
    /// Creates a manager with no live session.
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            settings: ConnectionSettings::default(),
            session: RwLock::new(None),
        }
    }

    /// Sets the connection defaults.
    pub fn with_settings(mut self, settings: ConnectionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Returns the connection defaults.
    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Replaces any live session with a new one.
    ///
    /// Never fails: connection errors are reported through a disconnected
    /// status whose message starts with "Connection failed". The session slot
    /// is not locked while the connector runs, so status checks stay responsive
    /// during a slow connect.
    pub fn connect(&self, request: &ConnectRequest) -> ConnectionStatus {
        let previous = self.session.write().take();
        if let Some(previous) = previous {
            tracing::info!(
                "Closing session {} to {}:{}",
                previous.id(),
                previous.host(),
                previous.port()
            );
            previous.close();
        }

        let host = request
            .host
            .clone()
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| self.settings.default_host.clone());
        let port = request.port.unwrap_or(self.settings.default_port);

        let mut config =
            ClientConfig::new(host.clone(), port).with_connect_timeout(self.settings.connect_timeout);
        if let (Some(user), Some(password)) = (&request.username, &request.password) {
            config = config.with_credentials(Credentials::new(user.clone(), password.clone()));
        }
        let username = config.credentials.as_ref().map(|c| c.username.clone());

        match self.connector.connect(&config) {
            Ok(client) => {
                let session = Session::new(client, host, port, username);
                tracing::info!(
                    "Connected to {} (session {})",
                    config.endpoint(),
                    session.id()
                );
                let mut slot = self.session.write();
                if let Some(raced) = slot.replace(session) {
                    tracing::info!("Closing session {} replaced by a concurrent connect", raced.id());
                    raced.close();
                }
                let slot = RwLockWriteGuard::downgrade(slot);
                Self::status_of(slot.as_ref())
            }
            Err(e) if e.is_connect_failure() => {
                tracing::warn!("Failed to connect to {}: {}", config.endpoint(), e);
                ConnectionStatus::disconnected(format!("Connection failed: {}", e))
            }
            Err(e) => {
                tracing::error!("Failed to connect to {}: {}", config.endpoint(), e);
                ConnectionStatus::disconnected(format!("Connection failed: {}", e))
            }
        }
    }

    /// Reports the current connection state without reconnecting.
    pub fn status(&self) -> ConnectionStatus {
        Self::status_of(self.session.read().as_ref())
    }

    fn status_of(session: Option<&Session>) -> ConnectionStatus {
        let Some(session) = session.filter(|s| s.is_connected()) else {
            return ConnectionStatus::disconnected("Not connected");
        };

        let nodes = session.client().nodes();
        ConnectionStatus {
            connected: true,
            cluster_name: Some(derive_cluster_name(&nodes)),
            nodes: nodes.into_iter().map(NodeInfo::from).collect(),
            message: "Connected successfully".to_string(),
        }
    }

    /// Releases the live session, if any.
    pub fn disconnect(&self) {
        if let Some(session) = self.session.write().take() {
            session.close();
            tracing::info!(
                "Disconnected session {} after {:?} ({} operations)",
                session.id(),
                session.age(),
                session.operation_count()
            );
        }
    }

    /// Returns whether a connected session is live.
    pub fn is_connected(&self) -> bool {
        self.session
            .read()
            .as_ref()
            .is_some_and(|s| s.is_connected())
    }

    /// Returns the live session or fails with [`CoreError::NotConnected`].
    ///
    /// The guard blocks `connect`/`disconnect` until it is dropped.
    pub fn require_session(&self) -> Result<SessionGuard<'_>, CoreError> {
        RwLockReadGuard::try_map(self.session.read(), |slot| {
            slot.as_ref().filter(|s| s.is_connected())
        })
        .map_err(|_| CoreError::NotConnected)
    }
}
