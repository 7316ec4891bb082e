//! Storage error types.

use strata_core::PartitionId;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The named topic does not exist.
    #[error("topic not found: {topic}")]
    TopicNotFound {
        /// The missing topic.
        topic: String,
    },

    /// The partition does not exist within the topic.
    #[error("partition {partition} not found in topic {topic}")]
    PartitionNotFound {
        /// The topic.
        topic: String,
        /// The missing partition.
        partition: PartitionId,
    },

    /// A record targeted a compacted topic without a message key.
    #[error("compacted topic {topic} requires a message key")]
    MissingKey {
        /// The compacted topic.
        topic: String,
    },

    /// I/O failure in the underlying engine.
    #[error("I/O error: {operation}: {message}")]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// Error message.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::TopicNotFound {
            topic: "payments".into(),
        };
        assert!(err.to_string().contains("payments"));

        let err = StorageError::PartitionNotFound {
            topic: "payments".into(),
            partition: PartitionId::new(3),
        };
        assert!(err.to_string().contains("partition-3"));
    }
}
