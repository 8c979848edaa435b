//! Info command names.

use crate::error::InfoError;
use std::fmt;
use std::str::FromStr;

/// An info command understood by cluster nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InfoCommand {
    /// `namespaces`: `;`-separated namespace names.
    Namespaces,
    /// `namespace/<ns>`: statistics and configuration of one namespace.
    Namespace(String),
    /// `sets/<ns>`: one segment per set in the namespace.
    Sets(String),
    /// `node`: the node name.
    Node,
    /// `build`: the server build version.
    Build,
    /// `cluster-name`: the configured cluster name.
    ClusterName,
}

impl fmt::Display for InfoCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfoCommand::Namespaces => f.write_str("namespaces"),
            InfoCommand::Namespace(ns) => write!(f, "namespace/{}", ns),
            InfoCommand::Sets(ns) => write!(f, "sets/{}", ns),
            InfoCommand::Node => f.write_str("node"),
            InfoCommand::Build => f.write_str("build"),
            InfoCommand::ClusterName => f.write_str("cluster-name"),
        }
    }
}

impl FromStr for InfoCommand {
    type Err = InfoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, arg) = match s.split_once('/') {
            Some((name, arg)) => (name, Some(arg)),
            None => (s, None),
        };

        match (name, arg) {
            ("namespaces", None) => Ok(InfoCommand::Namespaces),
            ("node", None) => Ok(InfoCommand::Node),
            ("build", None) => Ok(InfoCommand::Build),
            ("cluster-name", None) => Ok(InfoCommand::ClusterName),
            ("namespace", Some(ns)) if !ns.is_empty() => Ok(InfoCommand::Namespace(ns.to_string())),
            ("namespace", _) => Err(InfoError::MissingArgument("namespace")),
            ("sets", Some(ns)) if !ns.is_empty() => Ok(InfoCommand::Sets(ns.to_string())),
            ("sets", _) => Err(InfoError::MissingArgument("sets")),
            _ => Err(InfoError::UnknownCommand(s.to_string())),
        }
    }
}
