//! Mark recording and mark queries.
//!
//! [`OffsetManager`] is the public face of the offset subsystem. Every
//! operation resolves the offset-topic partition owning the stream, then
//! either runs locally (this broker leads the partition) or forwards to
//! the leader through the router. The manager holds no mutable state of
//! its own beyond handles to its collaborators; concurrent marks are
//! linearized by the replicated produce underneath.

use std::sync::Arc;

use strata_cluster::{ClusterView, PeerTransport};
use strata_core::{
    GetMarkRequest, IsAcknowledgedRequest, LastOffsetRequest, MarkKind, MarkRequest, Offset,
    OffsetGenerator, PartitionId, Record,
};
use strata_storage::MessageStore;
use bytes::Bytes;
use tracing::debug;

use crate::config::OffsetsConfig;
use crate::error::{OffsetsError, OffsetsResult};
use crate::keys;
use crate::router::OffsetRouter;
use crate::topic::OffsetTopic;

/// The consumer offset subsystem of one broker.
pub struct OffsetManager {
    pub(crate) store: Arc<dyn MessageStore>,
    pub(crate) cluster: Arc<dyn ClusterView>,
    pub(crate) transport: Arc<dyn PeerTransport>,
    pub(crate) topic: OffsetTopic,
    pub(crate) router: OffsetRouter,
    pub(crate) generator: OffsetGenerator,
    pub(crate) config: OffsetsConfig,
}

impl OffsetManager {
    /// Creates the subsystem over its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn MessageStore>,
        cluster: Arc<dyn ClusterView>,
        transport: Arc<dyn PeerTransport>,
        config: OffsetsConfig,
    ) -> Self {
        let topic = OffsetTopic::new(Arc::clone(&store), config.topic.clone());
        let router = OffsetRouter::new(Arc::clone(&cluster), config.topic.clone(), config.leader_ttl);
        Self {
            store,
            cluster,
            transport,
            topic,
            router,
            generator: OffsetGenerator::new(),
            config,
        }
    }

    /// The internal topic handle.
    #[must_use]
    pub const fn offset_topic(&self) -> &OffsetTopic {
        &self.topic
    }

    /// Records the marks in `request` on the stream's partition leader.
    ///
    /// Returns `true` once the produce has been accepted for replication.
    /// An empty `offsets` list succeeds without producing anything.
    /// Re-recording the same (stream, offset, kind) is idempotent.
    ///
    /// # Errors
    /// Returns `NoLeaderFound`, `Forwarding`, a limit violation, or the
    /// storage error from the produce.
    pub async fn mark(&self, request: MarkRequest) -> OffsetsResult<bool> {
        self.check_name("topic", &request.topic)?;
        self.check_name("consumer_group", &request.consumer_group)?;
        self.check_batch(&request)?;

        if request.offsets.is_empty() {
            debug!(topic = %request.topic, group = %request.consumer_group, "empty mark request");
            return Ok(true);
        }

        let stream_key =
            keys::encode_stream_key(&request.topic, request.partition, &request.consumer_group)?;
        let partition = self.owning_partition(&stream_key).await?;

        let forward = request.clone();
        self.router
            .dispatch(
                partition,
                || self.mark_local(partition, stream_key, &request),
                |node| async move {
                    self.transport.mark(node, forward).await.map(|r| r.success)
                },
            )
            .await
    }

    /// The greatest offset ever marked with `kind` on the stream, or
    /// [`Offset::NIL`] if the stream carries no such mark.
    ///
    /// # Errors
    /// Returns `NoLeaderFound`, `Forwarding`, `MalformedRecord` if the
    /// stored value is empty, or the storage error from the lookup.
    pub async fn last_offset(
        &self,
        topic: &str,
        partition: PartitionId,
        consumer_group: &str,
        kind: MarkKind,
    ) -> OffsetsResult<Offset> {
        self.check_name("topic", topic)?;
        self.check_name("consumer_group", consumer_group)?;

        let stream_key = keys::encode_stream_key(topic, partition, consumer_group)?;
        let owner = self.owning_partition(&stream_key).await?;

        let forward = LastOffsetRequest {
            topic: topic.to_string(),
            partition,
            consumer_group: consumer_group.to_string(),
            kind,
        };
        self.router
            .dispatch(
                owner,
                || self.last_offset_local(owner, stream_key, kind),
                |node| async move {
                    self.transport.last_offset(node, forward).await.map(|r| r.offset)
                },
            )
            .await
    }

    /// The stored record of a specific marked offset.
    ///
    /// The cell is addressed by offset alone; kinds are probed in
    /// declaration order and the first match wins.
    ///
    /// # Errors
    /// Returns [`OffsetsError::NotFound`] if no kind has marked the
    /// offset, plus the routing errors of every operation.
    pub async fn mark_state_message(
        &self,
        topic: &str,
        partition: PartitionId,
        consumer_group: &str,
        offset: Offset,
    ) -> OffsetsResult<Record> {
        self.check_name("topic", topic)?;
        self.check_name("consumer_group", consumer_group)?;

        let stream_key = keys::encode_stream_key(topic, partition, consumer_group)?;
        let owner = self.owning_partition(&stream_key).await?;

        let forward = GetMarkRequest {
            topic: topic.to_string(),
            partition,
            consumer_group: consumer_group.to_string(),
            offset,
        };
        let found = self
            .router
            .dispatch(
                owner,
                || self.mark_state_local(owner, stream_key, offset),
                |node| async move { self.transport.get_mark_state(node, forward).await },
            )
            .await?;
        found.ok_or(OffsetsError::NotFound)
    }

    /// Whether the stream carries an Acknowledged mark for `offset`.
    ///
    /// # Errors
    /// Returns the routing errors of every operation.
    pub async fn is_acknowledged(
        &self,
        topic: &str,
        partition: PartitionId,
        consumer_group: &str,
        offset: Offset,
    ) -> OffsetsResult<bool> {
        self.check_name("topic", topic)?;
        self.check_name("consumer_group", consumer_group)?;

        let stream_key = keys::encode_stream_key(topic, partition, consumer_group)?;
        let owner = self.owning_partition(&stream_key).await?;

        let forward = IsAcknowledgedRequest {
            topic: topic.to_string(),
            partition,
            consumer_group: consumer_group.to_string(),
            offset,
        };
        self.router
            .dispatch(
                owner,
                || self.is_acknowledged_local(owner, stream_key, offset),
                |node| async move {
                    self.transport
                        .is_acknowledged(node, forward)
                        .await
                        .map(|r| r.acknowledged)
                },
            )
            .await
    }

    // -------------------------------------------------------------------
    // Local handlers
    // -------------------------------------------------------------------

    async fn mark_local(
        &self,
        partition: PartitionId,
        stream_key: Bytes,
        request: &MarkRequest,
    ) -> OffsetsResult<bool> {
        let state = request.state.clone().unwrap_or_default();
        let value = state.encode();

        let mut records = Vec::with_capacity(request.offsets.len());
        for &offset in &request.offsets {
            // Positional kinds sit at the marked offset so the compacted
            // lookup returns position; a redelivery signal gets a fresh one.
            let record_offset = if state.kind.is_positional() {
                offset
            } else {
                self.generator.next()
            };
            records.push(Record::with_keys(
                record_offset,
                stream_key.clone(),
                keys::encode_cell_key(offset, state.kind),
                value.clone(),
            ));
        }

        let count = records.len();
        self.topic.produce(partition, records).await?;
        debug!(
            topic = %request.topic,
            group = %request.consumer_group,
            kind = ?state.kind,
            count,
            "recorded marks"
        );
        Ok(true)
    }

    async fn last_offset_local(
        &self,
        partition: PartitionId,
        stream_key: Bytes,
        kind: MarkKind,
    ) -> OffsetsResult<Offset> {
        let prefix = keys::kind_prefix(kind);
        let Some(record) = self.topic.get_message(partition, &stream_key, &prefix).await? else {
            return Ok(Offset::NIL);
        };

        if record.value.is_empty() {
            return Err(OffsetsError::MalformedRecord {
                reason: format!("empty value for kind {kind:?}"),
            });
        }
        Ok(record.offset)
    }

    async fn mark_state_local(
        &self,
        partition: PartitionId,
        stream_key: Bytes,
        offset: Offset,
    ) -> OffsetsResult<Option<Record>> {
        for kind in MarkKind::all() {
            let cell = keys::encode_cell_key(offset, kind);
            if let Some(record) = self.topic.get_message(partition, &stream_key, &cell).await? {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    async fn is_acknowledged_local(
        &self,
        partition: PartitionId,
        stream_key: Bytes,
        offset: Offset,
    ) -> OffsetsResult<bool> {
        let cell = keys::encode_cell_key(offset, MarkKind::Acknowledged);
        self.topic.has_key(partition, &stream_key, &cell).await
    }

    // -------------------------------------------------------------------
    // Validation and routing helpers
    // -------------------------------------------------------------------

    pub(crate) async fn owning_partition(&self, stream_key: &[u8]) -> OffsetsResult<PartitionId> {
        let partitions = self.topic.partitions().await?;
        Ok(OffsetTopic::choose_partition(stream_key, &partitions))
    }

    fn check_name(&self, limit: &'static str, value: &str) -> OffsetsResult<()> {
        let max = u64::from(self.config.limits.max_name_bytes);
        if value.len() as u64 > max {
            return Err(OffsetsError::LimitExceeded {
                limit,
                max,
                actual: value.len() as u64,
            });
        }
        Ok(())
    }

    fn check_batch(&self, request: &MarkRequest) -> OffsetsResult<()> {
        let max = u64::from(self.config.limits.max_marks_per_request);
        if request.offsets.len() as u64 > max {
            return Err(OffsetsError::LimitExceeded {
                limit: "marks_per_request",
                max,
                actual: request.offsets.len() as u64,
            });
        }

        if let Some(state) = &request.state {
            let max = u64::from(self.config.limits.max_state_payload_bytes);
            if state.payload.len() as u64 > max {
                return Err(OffsetsError::LimitExceeded {
                    limit: "state_payload_bytes",
                    max,
                    actual: state.payload.len() as u64,
                });
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for OffsetManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OffsetManager")
            .field("topic", &self.config.topic)
            .field("node", &self.cluster.local_node())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{single_node, NoForward};
    use strata_core::{MarkState, NodeId};
    use strata_storage::{MemoryStore, StorageError};

    fn mark_request(offsets: Vec<Offset>, kind: MarkKind) -> MarkRequest {
        MarkRequest {
            topic: "payments".into(),
            partition: PartitionId::new(0),
            consumer_group: "group1".into(),
            offsets,
            state: Some(MarkState::new(kind)),
        }
    }

    #[tokio::test]
    async fn test_last_offset_is_max_of_marks() {
        let (node, _store) = single_node().await;
        let gen = OffsetGenerator::new();
        let (o1, o2, o3) = (gen.next(), gen.next(), gen.next());

        // Marked out of order; the answer is still the maximum.
        for offset in [o2, o3, o1] {
            assert!(node.mark(mark_request(vec![offset], MarkKind::Acknowledged)).await.unwrap());
        }

        let got = node
            .last_offset("payments", PartitionId::new(0), "group1", MarkKind::Acknowledged)
            .await
            .unwrap();
        assert_eq!(got, o3);
    }

    #[tokio::test]
    async fn test_unmarked_stream_answers_nil() {
        let (node, _store) = single_node().await;

        let got = node
            .last_offset("payments", PartitionId::new(0), "group1", MarkKind::Committed)
            .await
            .unwrap();
        assert!(got.is_nil());
    }

    #[tokio::test]
    async fn test_kinds_are_independent() {
        let (node, _store) = single_node().await;
        let gen = OffsetGenerator::new();
        let (o_commit, o_ack) = (gen.next(), gen.next());

        node.mark(mark_request(vec![o_ack], MarkKind::Acknowledged)).await.unwrap();
        node.mark(mark_request(vec![o_commit], MarkKind::Committed)).await.unwrap();

        let p = PartitionId::new(0);
        let acked = node.last_offset("payments", p, "group1", MarkKind::Acknowledged).await.unwrap();
        let committed = node.last_offset("payments", p, "group1", MarkKind::Committed).await.unwrap();
        assert_eq!(acked, o_ack);
        assert_eq!(committed, o_commit);
    }

    #[tokio::test]
    async fn test_mark_is_idempotent() {
        let (node, store) = single_node().await;
        let offset = OffsetGenerator::new().next();
        let request = mark_request(vec![offset], MarkKind::Acknowledged);

        node.mark(request.clone()).await.unwrap();
        let counts_after_first: Vec<usize> = (0..3)
            .map(|p| store.record_count("__consumer_offsets", PartitionId::new(p)))
            .collect();

        node.mark(request).await.unwrap();
        let counts_after_second: Vec<usize> = (0..3)
            .map(|p| store.record_count("__consumer_offsets", PartitionId::new(p)))
            .collect();

        assert_eq!(counts_after_first, counts_after_second);
        assert!(node
            .is_acknowledged("payments", PartitionId::new(0), "group1", offset)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_empty_mark_request_is_a_noop() {
        let (node, store) = single_node().await;

        assert!(node.mark(mark_request(vec![], MarkKind::Acknowledged)).await.unwrap());
        for p in 0..3 {
            assert_eq!(store.record_count("__consumer_offsets", PartitionId::new(p)), 0);
        }
    }

    #[tokio::test]
    async fn test_batched_marks_land_together() {
        let (node, _store) = single_node().await;
        let gen = OffsetGenerator::new();
        let offsets: Vec<Offset> = (0..5).map(|_| gen.next()).collect();

        node.mark(mark_request(offsets.clone(), MarkKind::Acknowledged)).await.unwrap();

        for offset in &offsets {
            assert!(node
                .is_acknowledged("payments", PartitionId::new(0), "group1", *offset)
                .await
                .unwrap());
        }
    }

    #[tokio::test]
    async fn test_is_acknowledged_is_per_offset_and_kind() {
        let (node, _store) = single_node().await;
        let gen = OffsetGenerator::new();
        let (marked, unmarked) = (gen.next(), gen.next());
        let p = PartitionId::new(0);

        node.mark(mark_request(vec![marked], MarkKind::Committed)).await.unwrap();

        // A committed mark is not an acknowledgement.
        assert!(!node.is_acknowledged("payments", p, "group1", marked).await.unwrap());

        node.mark(mark_request(vec![marked], MarkKind::Acknowledged)).await.unwrap();
        assert!(node.is_acknowledged("payments", p, "group1", marked).await.unwrap());
        assert!(!node.is_acknowledged("payments", p, "group1", unmarked).await.unwrap());
    }

    #[tokio::test]
    async fn test_mark_state_message_returns_latest_payload() {
        let (node, _store) = single_node().await;
        let offset = OffsetGenerator::new().next();
        let p = PartitionId::new(0);

        for i in 0..3 {
            let request = MarkRequest {
                topic: "payments".into(),
                partition: p,
                consumer_group: "group1".into(),
                offsets: vec![offset],
                state: Some(MarkState::with_payload(
                    MarkKind::Acknowledged,
                    format!("attempt={i}"),
                )),
            };
            node.mark(request).await.unwrap();
        }

        let record = node.mark_state_message("payments", p, "group1", offset).await.unwrap();
        let state = MarkState::decode(&record.value).unwrap();
        assert_eq!(state.payload, Bytes::from("attempt=2"));
    }

    #[tokio::test]
    async fn test_same_offset_marks_of_different_kinds_keep_their_payloads() {
        let (node, _store) = single_node().await;
        let offset = OffsetGenerator::new().next();
        let p = PartitionId::new(0);

        // Acknowledge then commit the same offset, each with its own
        // payload: two independent cells, not one overwritten slot.
        for (kind, payload) in [
            (MarkKind::Acknowledged, "processed"),
            (MarkKind::Committed, "restart-point"),
        ] {
            let request = MarkRequest {
                topic: "payments".into(),
                partition: p,
                consumer_group: "group1".into(),
                offsets: vec![offset],
                state: Some(MarkState::with_payload(kind, payload)),
            };
            node.mark(request).await.unwrap();
        }

        // The offset-addressed lookup probes kinds in declaration order,
        // so it must surface the Acknowledged cell's own bytes.
        let record = node.mark_state_message("payments", p, "group1", offset).await.unwrap();
        let state = MarkState::decode(&record.value).unwrap();
        assert_eq!(state.kind, MarkKind::Acknowledged);
        assert_eq!(state.payload, Bytes::from("processed"));

        let acked = node.last_offset("payments", p, "group1", MarkKind::Acknowledged).await.unwrap();
        let committed = node.last_offset("payments", p, "group1", MarkKind::Committed).await.unwrap();
        assert_eq!(acked, offset);
        assert_eq!(committed, offset);
    }

    #[tokio::test]
    async fn test_mark_state_message_not_found() {
        let (node, _store) = single_node().await;

        let err = node
            .mark_state_message(
                "payments",
                PartitionId::new(0),
                "group1",
                OffsetGenerator::new().next(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OffsetsError::NotFound));
    }

    #[tokio::test]
    async fn test_leaderless_partition_fails_closed() {
        // A node whose leader table is empty: every operation must fail
        // with NoLeaderFound rather than falling back to local storage.
        let store = MemoryStore::new();
        let cluster = Arc::new(strata_cluster::StaticCluster::new(NodeId::new(1)));
        let node = OffsetManager::new(
            Arc::new(store.clone()),
            cluster,
            Arc::new(NoForward),
            OffsetsConfig::for_testing(),
        );
        node.bootstrap().await.unwrap();

        let err = node
            .mark(mark_request(vec![OffsetGenerator::new().next()], MarkKind::Acknowledged))
            .await
            .unwrap_err();
        assert!(matches!(err, OffsetsError::NoLeaderFound { .. }));
        assert!(err.is_transient());
        for p in 0..3 {
            assert_eq!(store.record_count("__consumer_offsets", PartitionId::new(p)), 0);
        }
    }

    #[tokio::test]
    async fn test_malformed_stored_value_surfaces() {
        let (node, store) = single_node().await;
        let offset = OffsetGenerator::new().next();
        let p = PartitionId::new(0);

        // Plant a record with an empty value directly in the offset topic,
        // bypassing the recorder.
        let stream_key = keys::encode_stream_key("payments", p, "group1").unwrap();
        let owner = node.owning_partition(&stream_key).await.unwrap();
        let cell = keys::encode_cell_key(offset, MarkKind::Committed);
        store
            .produce(
                "__consumer_offsets",
                owner,
                vec![Record::with_keys(offset, stream_key, cell, Bytes::new())],
            )
            .await
            .unwrap();

        let err = node
            .last_offset("payments", p, "group1", MarkKind::Committed)
            .await
            .unwrap_err();
        assert!(matches!(err, OffsetsError::MalformedRecord { .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_produce_failure_propagates() {
        let (node, store) = single_node().await;

        store.fail_next_produce();
        let err = node
            .mark(mark_request(vec![OffsetGenerator::new().next()], MarkKind::Acknowledged))
            .await
            .unwrap_err();
        assert!(matches!(err, OffsetsError::Storage(StorageError::Io { .. })));
    }

    #[tokio::test]
    async fn test_empty_topic_name_is_an_encoding_failure() {
        let (node, _store) = single_node().await;

        let err = node
            .last_offset("", PartitionId::new(0), "group1", MarkKind::Acknowledged)
            .await
            .unwrap_err();
        assert!(matches!(err, OffsetsError::Encoding(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_oversized_batch_is_rejected() {
        let (node, store) = single_node().await;
        let mut config = OffsetsConfig::for_testing();
        config.limits.max_marks_per_request = 2;
        let strict = OffsetManager::new(
            Arc::new(store.clone()),
            Arc::clone(&node.cluster),
            Arc::new(NoForward),
            config,
        );

        let gen = OffsetGenerator::new();
        let offsets: Vec<Offset> = (0..3).map(|_| gen.next()).collect();
        let err = strict
            .mark(mark_request(offsets, MarkKind::Acknowledged))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OffsetsError::LimitExceeded {
                limit: "marks_per_request",
                ..
            }
        ));
    }
}
