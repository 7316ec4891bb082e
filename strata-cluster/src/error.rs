//! Cluster error types.

use strata_core::NodeId;
use thiserror::Error;

/// Result type for cluster operations.
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Errors that can occur talking to other brokers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClusterError {
    /// The peer could not be reached.
    #[error("peer {node} unreachable: {message}")]
    Unreachable {
        /// The peer that could not be reached.
        node: NodeId,
        /// Transport error message.
        message: String,
    },

    /// The peer was reached but its handler failed.
    #[error("remote handler on {node} failed: {message}")]
    Remote {
        /// The peer whose handler failed.
        node: NodeId,
        /// The remote error, verbatim.
        message: String,
    },
}

impl ClusterError {
    /// The peer this error concerns.
    #[must_use]
    pub const fn node(&self) -> NodeId {
        match self {
            Self::Unreachable { node, .. } | Self::Remote { node, .. } => *node,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_names_the_peer() {
        let err = ClusterError::Unreachable {
            node: NodeId::new(3),
            message: "connection refused".into(),
        };
        assert!(err.to_string().contains("node-3"));
        assert_eq!(err.node(), NodeId::new(3));
    }
}
