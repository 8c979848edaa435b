//! # aerodeck-server
//!
//! HTTP server for aerodeck.
//!
//! This crate provides:
//! - REST routing over the connection, catalog, record and search services
//! - JSON request and response mapping with uniform error bodies
//! - YAML configuration with environment overrides
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handler;
pub mod metrics;
pub mod server;

pub use config::{ClusterConfig, Config, ConfigError, HttpConfig, MetricsConfig};
pub use error::{ErrorBody, ServerError};
pub use handler::{ApiHandler, ApiRequest, ApiResponse};
pub use metrics::{run_metrics_server, Metrics};
pub use server::{Server, ServerConfig, ServerStats};
