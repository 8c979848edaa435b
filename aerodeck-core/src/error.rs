//! Core error types.

use aerodeck_cluster::ClusterError;
use thiserror::Error;

/// Errors from catalog, record and search operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not connected to a cluster, connect first")]
    NotConnected,

    #[error("Failed to {context}: {source}")]
    Operation {
        context: &'static str,
        #[source]
        source: ClusterError,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl CoreError {
    /// Returns a mapper that wraps a cluster error with an operation context.
    ///
    /// Arguments the cluster rejects are the caller's fault and surface as
    /// [`CoreError::InvalidRequest`].
    pub fn operation(context: &'static str) -> impl FnOnce(ClusterError) -> CoreError {
        move |source| match source {
            ClusterError::InvalidArgument(message) => CoreError::InvalidRequest(message),
            source => CoreError::Operation { context, source },
        }
    }

    /// Returns an error code suitable for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::NotConnected => "NOT_CONNECTED",
            CoreError::Operation { .. } => "OPERATION_FAILED",
            CoreError::InvalidRequest(_) => "BAD_REQUEST",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_message_wraps_cause() {
        let err = CoreError::operation("get namespaces")(ClusterError::Info("boom".into()));
        assert_eq!(
            err.to_string(),
            "Failed to get namespaces: info command failed: boom"
        );
        assert_eq!(err.error_code(), "OPERATION_FAILED");
    }

    #[test]
    fn test_rejected_argument_is_invalid_request() {
        let err = CoreError::operation("put record")(ClusterError::InvalidArgument(
            "bin name too long".into(),
        ));
        assert!(matches!(err, CoreError::InvalidRequest(_)));
        assert_eq!(err.error_code(), "BAD_REQUEST");
    }
}
