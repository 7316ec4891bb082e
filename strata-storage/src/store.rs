//! The storage-engine contract.
//!
//! Everything the offset subsystem needs from the storage engine fits in
//! one trait: topic creation and metadata, replicated produce, key-indexed
//! lookup, key-existence checks, and ordered range scans. Keys are opaque
//! bytes to the engine; their meaning belongs to the caller.

use async_trait::async_trait;
use strata_core::{Offset, PartitionId, Record};

use crate::error::StorageResult;

/// Retention behavior of a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TopicKind {
    /// Records are retained in offset order.
    #[default]
    Ordered,
    /// Records sharing a (key, clustering key) pair collapse to the latest.
    Compacted,
}

/// Parameters for topic creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSpec {
    /// Topic name.
    pub name: String,
    /// Retention behavior.
    pub kind: TopicKind,
    /// Number of partitions. Fixed after creation.
    pub partitions: u32,
    /// Replication factor. Fixed after creation.
    pub replication: u32,
}

/// Metadata of an existing topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMeta {
    /// Topic name.
    pub name: String,
    /// Retention behavior.
    pub kind: TopicKind,
    /// The topic's partitions, in stable order.
    pub partitions: Vec<PartitionId>,
    /// Replication factor.
    pub replication: u32,
}

/// Result of an accepted produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProduceReceipt {
    /// Number of records accepted for replication.
    pub appended: u32,
}

/// The storage engine as seen by the offset subsystem.
///
/// Implementations must be safe for concurrent use; the replicated produce
/// linearizes writes within a partition.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Creates a topic.
    ///
    /// Returns `true` if the topic was created, `false` if it already
    /// existed (creation is idempotent).
    ///
    /// # Errors
    /// Returns an error if the engine rejects the spec.
    async fn create_topic(&self, spec: TopicSpec) -> StorageResult<bool>;

    /// Returns the metadata of a topic, or `None` if it does not exist.
    ///
    /// # Errors
    /// Returns an error if the engine cannot answer.
    async fn topic(&self, name: &str) -> StorageResult<Option<TopicMeta>>;

    /// Appends records to a partition, replicated to the configured quorum.
    ///
    /// The batch is atomic: either every record is accepted or the call
    /// fails.
    ///
    /// # Errors
    /// Returns an error if the topic or partition is missing, a record is
    /// invalid for the topic kind, or replication fails.
    async fn produce(
        &self,
        topic: &str,
        partition: PartitionId,
        records: Vec<Record>,
    ) -> StorageResult<ProduceReceipt>;

    /// Key-indexed lookup.
    ///
    /// Among records whose message key equals `key` and whose clustering
    /// key starts with `clustering_prefix`, returns the record with the
    /// greatest clustering key, or `None`. An empty prefix matches every
    /// clustering key under `key`. Passing a full clustering key performs
    /// an exact lookup when clustering keys are fixed-length.
    ///
    /// # Errors
    /// Returns an error if the topic or partition is missing.
    async fn get_message(
        &self,
        topic: &str,
        partition: PartitionId,
        key: &[u8],
        clustering_prefix: &[u8],
    ) -> StorageResult<Option<Record>>;

    /// Returns true iff a record with exactly this (key, clustering key)
    /// pair is present.
    ///
    /// # Errors
    /// Returns an error if the topic or partition is missing.
    async fn has_key(
        &self,
        topic: &str,
        partition: PartitionId,
        key: &[u8],
        clustering_key: &[u8],
    ) -> StorageResult<bool>;

    /// Ordered scan of a partition.
    ///
    /// Returns up to `max` records with offsets in `(from, to]`, in offset
    /// order.
    ///
    /// # Errors
    /// Returns an error if the topic or partition is missing.
    async fn range(
        &self,
        topic: &str,
        partition: PartitionId,
        from_exclusive: Offset,
        to_inclusive: Offset,
        max: u32,
    ) -> StorageResult<Vec<Record>>;
}
