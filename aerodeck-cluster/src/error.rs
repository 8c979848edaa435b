//! Cluster client error types.

use thiserror::Error;

/// Errors reported by a cluster client.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("operation timed out")]
    Timeout,

    #[error("client is closed")]
    Closed,

    #[error("info command failed: {0}")]
    Info(String),

    #[error("server error: {0}")]
    Server(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ClusterError {
    /// Returns whether this error happened while establishing a connection.
    pub fn is_connect_failure(&self) -> bool {
        matches!(
            self,
            ClusterError::Connection(_) | ClusterError::Auth(_) | ClusterError::Timeout
        )
    }
}

impl From<aerodeck_info::InfoError> for ClusterError {
    fn from(e: aerodeck_info::InfoError) -> Self {
        ClusterError::Info(e.to_string())
    }
}
