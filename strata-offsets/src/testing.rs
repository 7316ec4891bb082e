//! Shared fixtures for unit tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use strata_cluster::{ClusterError, ClusterResult, PeerTransport, StaticCluster};
use strata_core::{
    GetMarkRequest, IsAcknowledgedRequest, IsAcknowledgedResponse, LastOffsetRequest,
    LastOffsetResponse, MarkRequest, MarkResponse, NodeId, PartitionId, Record,
};
use strata_storage::MemoryStore;

use crate::config::{OffsetsConfig, OFFSET_TOPIC_NAME};
use crate::manager::OffsetManager;

/// A transport for single-node tests: every forward is a failure, because
/// nothing should be forwarded.
pub struct NoForward;

#[async_trait]
impl PeerTransport for NoForward {
    async fn mark(&self, node: NodeId, _request: MarkRequest) -> ClusterResult<MarkResponse> {
        Err(unreachable(node))
    }

    async fn last_offset(
        &self,
        node: NodeId,
        _request: LastOffsetRequest,
    ) -> ClusterResult<LastOffsetResponse> {
        Err(unreachable(node))
    }

    async fn get_mark_state(
        &self,
        node: NodeId,
        _request: GetMarkRequest,
    ) -> ClusterResult<Option<Record>> {
        Err(unreachable(node))
    }

    async fn is_acknowledged(
        &self,
        node: NodeId,
        _request: IsAcknowledgedRequest,
    ) -> ClusterResult<IsAcknowledgedResponse> {
        Err(unreachable(node))
    }
}

fn unreachable(node: NodeId) -> ClusterError {
    ClusterError::Unreachable {
        node,
        message: "no transport in single-node tests".into(),
    }
}

/// A bootstrapped single-broker subsystem leading every offset-topic
/// partition, over a fresh in-memory store.
pub async fn single_node() -> (OffsetManager, MemoryStore) {
    let store = MemoryStore::new();
    let cluster = Arc::new(StaticCluster::new(NodeId::new(1)));
    let config = OffsetsConfig::for_testing();

    let manager = OffsetManager::new(
        Arc::new(store.clone()),
        Arc::clone(&cluster) as Arc<dyn strata_cluster::ClusterView>,
        Arc::new(NoForward),
        config.clone(),
    );
    manager.bootstrap().await.expect("bootstrap");

    for p in 0..config.partitions {
        cluster
            .set_leader(OFFSET_TOPIC_NAME, PartitionId::new(u64::from(p)), NodeId::new(1))
            .await;
    }
    manager
        .wait_until_ready(Duration::from_secs(1))
        .await
        .expect("offset topic ready");

    (manager, store)
}
