//! Info protocol error types.

use thiserror::Error;

/// Errors produced while interpreting info commands.
///
/// Response parsing itself never fails; only command names can be rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InfoError {
    #[error("unknown info command: {0}")]
    UnknownCommand(String),

    #[error("info command '{0}' requires a non-empty argument")]
    MissingArgument(&'static str),
}
