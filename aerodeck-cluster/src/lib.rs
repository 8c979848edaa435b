//! # aerodeck-cluster
//!
//! The cluster client capability used by aerodeck.
//!
//! This crate provides:
//! - `ClusterClient` / `Connector` traits (node listing, info commands, point
//!   reads and writes, callback-driven scans)
//! - Record keys, digests and native values
//! - Scan and write policies
//! - `MemoryCluster`, an in-process cluster backend

pub mod client;
pub mod error;
pub mod key;
pub mod memory;
pub mod policy;
pub mod record;
pub mod value;

pub use client::{ClientConfig, ClusterClient, Connector, Credentials, Node};
pub use error::ClusterError;
pub use key::{Key, UserKey, DIGEST_SIZE};
pub use memory::{MemoryCluster, MemoryClusterConfig, MemoryNamespaceConfig, MemoryNodeConfig};
pub use policy::{ScanControl, ScanPolicy, WritePolicy};
pub use record::{Bins, Record};
pub use value::{signed_byte_array, Value};

/// Default cluster service port.
pub const DEFAULT_PORT: u16 = 3000;
