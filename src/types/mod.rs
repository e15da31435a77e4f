#![forbid(unsafe_code)]
//! Shared identifier, error, and result types.

use std::fmt;

use thiserror::Error;

use crate::transport::TransportError;

/// Sequential node identifier assigned in first-seen order within one import.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised while building or sending a bulk payload.
#[derive(Debug, Error)]
pub enum GraphLoadError {
    /// An entity declared properties missing from its type group header.
    #[error("entity of type '{label}' declares properties not in the group header: {keys:?}")]
    SchemaMismatch {
        /// Label of the group that rejected the entity.
        label: String,
        /// Offending property keys.
        keys: Vec<String>,
    },
    /// An edge referenced a node key that was never added.
    #[error("edge endpoint '{key}' was never added as a node")]
    UnresolvedEndpoint {
        /// The missing node key.
        key: String,
    },
    /// Sending a bulk task failed. Tasks before `task` were already applied.
    #[error("bulk task {task} failed to send: {source}")]
    TransportFailure {
        /// Zero-based index of the failed task.
        task: usize,
        /// Underlying transport error.
        #[source]
        source: TransportError,
    },
    /// A caller-supplied argument was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result alias for bulk-load operations.
pub type Result<T> = std::result::Result<T, GraphLoadError>;
