//! # aerodeck-info
//!
//! Parsing for the cluster's plaintext info protocol.
//!
//! This crate provides:
//! - `key=value` segment parsing with `:` separators
//! - `;`-separated list splitting
//! - Tolerant numeric coercion
//! - Info command names

pub mod command;
pub mod error;
pub mod parser;

pub use command::InfoCommand;
pub use error::InfoError;
pub use parser::{parse_i64, parse_info, parse_info_list, split_names, InfoRecord};

/// Separator between `key=value` pairs inside one segment.
pub const PAIR_SEPARATOR: char = ':';

/// Separator between segments (and between names in list responses).
pub const SEGMENT_SEPARATOR: char = ';';
