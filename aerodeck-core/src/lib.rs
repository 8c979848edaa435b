//! # aerodeck-core
//!
//! Cluster session and data-access layer for aerodeck.
//!
//! This crate provides:
//! - A single guarded cluster session with connect/disconnect/status
//! - Namespace and set listing over info commands
//! - Point reads, writes and deletes of records
//! - Bounded scans and key-pattern search

pub mod catalog;
pub mod connection;
pub mod error;
pub mod record;
pub mod search;
pub mod session;
pub mod value;

pub use catalog::{CatalogService, NamespaceDescriptor, SetDescriptor};
pub use connection::{
    ConnectRequest, ConnectionManager, ConnectionSettings, ConnectionStatus, NodeInfo,
    SessionGuard,
};
pub use error::CoreError;
pub use record::{key_text, key_value, RecordEnvelope, RecordStore};
pub use search::{MatchMode, ScanSearchEngine, SearchQuery};
pub use session::Session;
pub use value::BinValue;

#[cfg(test)]
pub(crate) mod testing;
