//! The reserved offset topic.
//!
//! Marks are stored on a well-known compacted topic inside the broker
//! itself. [`OffsetTopic`] wraps the storage contract with that topic name,
//! maps a missing topic to the operational
//! [`TopicNotFound`](crate::OffsetsError::TopicNotFound) error, and owns
//! the stable stream-to-partition mapping.

use std::sync::Arc;

use strata_core::{PartitionId, Record};
use strata_storage::{MessageStore, ProduceReceipt, TopicKind, TopicSpec};
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{OffsetsError, OffsetsResult};

/// Handle to the internal offset topic.
#[derive(Clone)]
pub struct OffsetTopic {
    store: Arc<dyn MessageStore>,
    name: String,
}

impl OffsetTopic {
    /// Creates a handle over the given store and topic name.
    #[must_use]
    pub fn new(store: Arc<dyn MessageStore>, name: String) -> Self {
        Self { store, name }
    }

    /// The topic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creates the topic if it does not exist. Idempotent.
    ///
    /// # Errors
    /// Returns an error if the storage engine rejects the creation.
    pub async fn ensure_created(&self, partitions: u32, replication: u32) -> OffsetsResult<()> {
        self.store
            .create_topic(TopicSpec {
                name: self.name.clone(),
                kind: TopicKind::Compacted,
                partitions,
                replication,
            })
            .await?;
        Ok(())
    }

    /// The topic's partitions, in stable order.
    ///
    /// # Errors
    /// Returns [`OffsetsError::TopicNotFound`] if the topic is missing.
    pub async fn partitions(&self) -> OffsetsResult<Vec<PartitionId>> {
        let meta = self
            .store
            .topic(&self.name)
            .await?
            .ok_or_else(|| OffsetsError::TopicNotFound {
                topic: self.name.clone(),
            })?;
        Ok(meta.partitions)
    }

    /// Maps a stream key to the partition that owns it.
    ///
    /// Pure in its inputs: the same key bytes and the same partition set
    /// always yield the same partition.
    ///
    /// # Panics
    /// Panics if `partitions` is empty; a created topic always has at
    /// least one partition.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // Partition counts fit in usize.
    pub fn choose_partition(stream_key: &[u8], partitions: &[PartitionId]) -> PartitionId {
        assert!(!partitions.is_empty(), "topic has no partitions");
        let index = (xxh3_64(stream_key) % partitions.len() as u64) as usize;
        partitions[index]
    }

    /// Replicated append to a partition of the offset topic.
    ///
    /// # Errors
    /// Returns an error if the topic is missing or the produce fails.
    pub async fn produce(
        &self,
        partition: PartitionId,
        records: Vec<Record>,
    ) -> OffsetsResult<ProduceReceipt> {
        Ok(self.store.produce(&self.name, partition, records).await?)
    }

    /// Key-indexed lookup against a partition of the offset topic.
    ///
    /// # Errors
    /// Returns an error if the topic is missing or the lookup fails.
    pub async fn get_message(
        &self,
        partition: PartitionId,
        key: &[u8],
        clustering_prefix: &[u8],
    ) -> OffsetsResult<Option<Record>> {
        Ok(self
            .store
            .get_message(&self.name, partition, key, clustering_prefix)
            .await?)
    }

    /// Exact (key, clustering key) existence check.
    ///
    /// # Errors
    /// Returns an error if the topic is missing or the check fails.
    pub async fn has_key(
        &self,
        partition: PartitionId,
        key: &[u8],
        clustering_key: &[u8],
    ) -> OffsetsResult<bool> {
        Ok(self
            .store
            .has_key(&self.name, partition, key, clustering_key)
            .await?)
    }
}

impl std::fmt::Debug for OffsetTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OffsetTopic").field("name", &self.name).finish_non_exhaustive()
    }
}
