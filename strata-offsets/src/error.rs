//! Offset subsystem error types.
//!
//! The subsystem never retries and never swallows errors; every variant
//! carries enough to let the caller distinguish transient conditions
//! (retry after backoff) from permanent ones (escalate).

use strata_core::{NodeId, PartitionId};
use strata_storage::StorageError;
use thiserror::Error;

use crate::keys::EncodingError;

/// Result type for offset operations.
pub type OffsetsResult<T> = Result<T, OffsetsError>;

/// Errors that can occur during offset operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OffsetsError {
    /// No live leader is known for the offset-topic partition.
    #[error("no leader found for {topic}/{partition}")]
    NoLeaderFound {
        /// The internal topic.
        topic: String,
        /// The leaderless partition.
        partition: PartitionId,
    },

    /// The internal offset topic is missing (bootstrap race).
    #[error("topic not found: {topic}")]
    TopicNotFound {
        /// The missing topic.
        topic: String,
    },

    /// A mark record exists but its value bytes do not decode.
    #[error("malformed mark record: {reason}")]
    MalformedRecord {
        /// What failed to decode.
        reason: String,
    },

    /// The queried (stream, offset) has no record.
    #[error("mark state not found")]
    NotFound,

    /// Forwarding to the partition leader failed; the remote error is
    /// surfaced unchanged.
    #[error("forwarding to {node} failed: {message}")]
    Forwarding {
        /// The leader the request was forwarded to.
        node: NodeId,
        /// The transport or remote-handler error, verbatim.
        message: String,
    },

    /// A stream or cell key could not be encoded. This is a bug condition:
    /// a production binary should treat it as fatal.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// The underlying storage engine failed.
    #[error(transparent)]
    Storage(StorageError),

    /// A request exceeded a configured limit.
    #[error("limit exceeded: {limit} (max={max}, actual={actual})")]
    LimitExceeded {
        /// Which limit was exceeded.
        limit: &'static str,
        /// The maximum allowed value.
        max: u64,
        /// The actual value.
        actual: u64,
    },
}

impl OffsetsError {
    /// Whether the caller may retry after a bounded backoff.
    ///
    /// Leadership gaps and forwarding failures heal as the cluster
    /// converges; everything else needs intervention.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::NoLeaderFound { .. } | Self::Forwarding { .. })
    }
}

impl From<StorageError> for OffsetsError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TopicNotFound { topic } => Self::TopicNotFound { topic },
            other => Self::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let transient = OffsetsError::NoLeaderFound {
            topic: "__consumer_offsets".into(),
            partition: PartitionId::new(0),
        };
        assert!(transient.is_transient());

        let transient = OffsetsError::Forwarding {
            node: NodeId::new(2),
            message: "connection reset".into(),
        };
        assert!(transient.is_transient());

        assert!(!OffsetsError::NotFound.is_transient());
        assert!(!OffsetsError::MalformedRecord {
            reason: "empty value".into()
        }
        .is_transient());
    }

    #[test]
    fn test_storage_topic_not_found_is_lifted() {
        let err = OffsetsError::from(StorageError::TopicNotFound {
            topic: "__consumer_offsets".into(),
        });
        assert!(matches!(err, OffsetsError::TopicNotFound { .. }));

        let err = OffsetsError::from(StorageError::Io {
            operation: "produce",
            message: "disk gone".into(),
        });
        assert!(matches!(err, OffsetsError::Storage(_)));
    }
}
