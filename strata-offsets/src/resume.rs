//! Consumer resume and the consumer-facing mark operations.
//!
//! Resuming consumption for (topic, partition, group) composes the two
//! progress axes: scan the data topic from the committed offset
//! (exclusive) and skip everything at or below the acknowledged offset.
//! `Committed` advances only the coarse restart point; `Acknowledged`
//! spares the broker redelivering what was processed between commit
//! points. The two are maintained independently so fine-grained delivery
//! progress never pays the cost of a commit.
//!
//! Commits are not required to be monotonic: rewinding the restart point
//! is how a group replays.

use strata_core::{MarkKind, MarkRequest, MarkState, Offset, PartitionId, Record};
use tracing::debug;

use crate::error::OffsetsResult;
use crate::manager::OffsetManager;

/// Where a consumer group stands on one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumePoint {
    /// The coarse restart point; scanning resumes after this offset.
    pub committed: Offset,
    /// The finest processed offset; nothing at or below it is redelivered.
    pub acknowledged: Offset,
}

impl OffsetManager {
    /// Reads both progress axes for a stream.
    ///
    /// # Errors
    /// Returns the routing errors of [`OffsetManager::last_offset`].
    pub async fn resume_point(
        &self,
        topic: &str,
        partition: PartitionId,
        consumer_group: &str,
    ) -> OffsetsResult<ResumePoint> {
        let committed = self
            .last_offset(topic, partition, consumer_group, MarkKind::Committed)
            .await?;
        let acknowledged = self
            .last_offset(topic, partition, consumer_group, MarkKind::Acknowledged)
            .await?;
        Ok(ResumePoint {
            committed,
            acknowledged,
        })
    }

    /// Fetches the next records for a consumer.
    ///
    /// Scans the data topic from the committed offset (exclusive), skips
    /// records already acknowledged, and returns up to `max` records in
    /// offset order. `consumer` is the externally assigned identity; it is
    /// carried for observability only.
    ///
    /// # Errors
    /// Returns the routing errors of the underlying queries or the
    /// storage error from the scan.
    pub async fn consume(
        &self,
        topic: &str,
        partition: PartitionId,
        consumer_group: &str,
        consumer: &str,
        max: u32,
    ) -> OffsetsResult<Vec<Record>> {
        let point = self.resume_point(topic, partition, consumer_group).await?;

        let scanned = self
            .store
            .range(
                topic,
                partition,
                point.committed,
                Offset::MAX,
                self.config.limits.max_records_per_fetch,
            )
            .await?;

        let delivered: Vec<Record> = scanned
            .into_iter()
            .filter(|record| record.offset > point.acknowledged)
            .take(max as usize)
            .collect();

        debug!(
            topic,
            %partition,
            group = consumer_group,
            consumer,
            delivered = delivered.len(),
            "resumed consumer fetch"
        );
        Ok(delivered)
    }

    /// Records that `consumer` has processed `offset`.
    ///
    /// # Errors
    /// Returns the errors of [`OffsetManager::mark`].
    pub async fn acknowledge(
        &self,
        topic: &str,
        partition: PartitionId,
        consumer_group: &str,
        consumer: &str,
        offset: Offset,
    ) -> OffsetsResult<bool> {
        self.mark_with_kind(
            topic,
            partition,
            consumer_group,
            consumer,
            vec![offset],
            MarkKind::Acknowledged,
        )
        .await
    }

    /// Records a batch of processed offsets in one produce.
    ///
    /// # Errors
    /// Returns the errors of [`OffsetManager::mark`].
    pub async fn acknowledge_batch(
        &self,
        topic: &str,
        partition: PartitionId,
        consumer_group: &str,
        consumer: &str,
        offsets: Vec<Offset>,
    ) -> OffsetsResult<bool> {
        self.mark_with_kind(
            topic,
            partition,
            consumer_group,
            consumer,
            offsets,
            MarkKind::Acknowledged,
        )
        .await
    }

    /// Moves the group's restart point to `offset`.
    ///
    /// Not required to advance: committing below the current point rewinds
    /// the stream for replay.
    ///
    /// # Errors
    /// Returns the errors of [`OffsetManager::mark`].
    pub async fn commit(
        &self,
        topic: &str,
        partition: PartitionId,
        consumer_group: &str,
        consumer: &str,
        offset: Offset,
    ) -> OffsetsResult<bool> {
        self.mark_with_kind(
            topic,
            partition,
            consumer_group,
            consumer,
            vec![offset],
            MarkKind::Committed,
        )
        .await
    }

    /// Records that `offset` was delivered, without any statement about
    /// processing.
    ///
    /// # Errors
    /// Returns the errors of [`OffsetManager::mark`].
    pub async fn mark_consumed(
        &self,
        topic: &str,
        partition: PartitionId,
        consumer_group: &str,
        consumer: &str,
        offset: Offset,
    ) -> OffsetsResult<bool> {
        self.mark_with_kind(
            topic,
            partition,
            consumer_group,
            consumer,
            vec![offset],
            MarkKind::Consumed,
        )
        .await
    }

    /// Signals that `offset` failed processing and should be redelivered.
    ///
    /// # Errors
    /// Returns the errors of [`OffsetManager::mark`].
    pub async fn not_acknowledge(
        &self,
        topic: &str,
        partition: PartitionId,
        consumer_group: &str,
        consumer: &str,
        offset: Offset,
    ) -> OffsetsResult<bool> {
        self.mark_with_kind(
            topic,
            partition,
            consumer_group,
            consumer,
            vec![offset],
            MarkKind::NotAcknowledged,
        )
        .await
    }

    async fn mark_with_kind(
        &self,
        topic: &str,
        partition: PartitionId,
        consumer_group: &str,
        consumer: &str,
        offsets: Vec<Offset>,
        kind: MarkKind,
    ) -> OffsetsResult<bool> {
        debug!(topic, %partition, group = consumer_group, consumer, ?kind, count = offsets.len(), "marking");
        self.mark(MarkRequest {
            topic: topic.to_string(),
            partition,
            consumer_group: consumer_group.to_string(),
            offsets,
            state: Some(MarkState::new(kind)),
        })
        .await
    }
}
