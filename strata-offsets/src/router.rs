//! Leader routing for offset operations.
//!
//! Every externally invoked operation takes the same path: find the leader
//! of the offset-topic partition that owns the stream, run the handler
//! locally if this broker is that leader, otherwise forward the request
//! unchanged and relay the answer. [`OffsetRouter::dispatch`] is that path,
//! expressed once: the caller supplies the local handler and the forward as
//! two callbacks.
//!
//! Forwarding never re-forwards. If leadership moved after resolution, the
//! remote broker answers `NoLeaderFound` itself and the caller retries at a
//! higher layer.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use strata_cluster::{ClusterError, ClusterView};
use strata_core::{NodeId, PartitionId};
use tracing::debug;

use crate::error::{OffsetsError, OffsetsResult};

/// Recently resolved leaders for the offset topic's partitions.
///
/// The offset topic's partition set is fixed at creation and small, so the
/// memo is bounded by it and needs no eviction policy: entries are stamped
/// with an expiry on insert and simply lapse. A failed forward calls
/// [`forget`](Self::forget) so the next operation re-consults the cluster
/// view instead of hammering a stale leader.
#[derive(Debug)]
struct LeaderMemo {
    ttl: Duration,
    entries: HashMap<PartitionId, (NodeId, Instant)>,
}

impl LeaderMemo {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// The remembered leader, unless its entry has lapsed.
    fn lookup(&self, partition: PartitionId) -> Option<NodeId> {
        let &(node, expires_at) = self.entries.get(&partition)?;
        (Instant::now() < expires_at).then_some(node)
    }

    /// Remembers a freshly resolved leader until the TTL lapses.
    fn store(&mut self, partition: PartitionId, node: NodeId) {
        self.entries.insert(partition, (node, Instant::now() + self.ttl));
    }

    /// Drops a partition's entry after its leader failed us.
    fn forget(&mut self, partition: PartitionId) {
        self.entries.remove(&partition);
    }
}

/// Routes offset operations to the partition leader.
pub struct OffsetRouter {
    cluster: Arc<dyn ClusterView>,
    leaders: Mutex<LeaderMemo>,
    /// Topic whose leadership is being routed (the offset topic).
    topic: String,
}

impl OffsetRouter {
    /// Creates a router for the given topic over the given cluster view.
    ///
    /// `leader_ttl` bounds how long a resolved leader is served without
    /// re-consulting the cluster view.
    #[must_use]
    pub fn new(cluster: Arc<dyn ClusterView>, topic: String, leader_ttl: Duration) -> Self {
        Self {
            cluster,
            leaders: Mutex::new(LeaderMemo::new(leader_ttl)),
            topic,
        }
    }

    /// The broker this router runs on.
    #[must_use]
    pub fn local_node(&self) -> NodeId {
        self.cluster.local_node()
    }

    /// Resolves the current leader of a partition.
    ///
    /// # Errors
    /// Returns [`OffsetsError::NoLeaderFound`] if no live leader is known.
    pub async fn resolve_leader(&self, partition: PartitionId) -> OffsetsResult<NodeId> {
        if let Some(remembered) = self
            .leaders
            .lock()
            .expect("leader memo lock poisoned")
            .lookup(partition)
        {
            return Ok(remembered);
        }

        match self.cluster.leader_of(&self.topic, partition).await {
            Some(leader) => {
                self.leaders
                    .lock()
                    .expect("leader memo lock poisoned")
                    .store(partition, leader);
                Ok(leader)
            }
            None => Err(OffsetsError::NoLeaderFound {
                topic: self.topic.clone(),
                partition,
            }),
        }
    }

    /// Runs an operation on the partition leader.
    ///
    /// `local` executes when this broker leads the partition; `remote`
    /// executes against the leader otherwise. A failed forward drops the
    /// remembered leader and surfaces as [`OffsetsError::Forwarding`].
    ///
    /// # Errors
    /// Returns [`OffsetsError::NoLeaderFound`] when resolution fails, the
    /// local handler's error when run locally, or
    /// [`OffsetsError::Forwarding`] when the forward fails.
    pub async fn dispatch<T, Local, LocalFut, Remote, RemoteFut>(
        &self,
        partition: PartitionId,
        local: Local,
        remote: Remote,
    ) -> OffsetsResult<T>
    where
        Local: FnOnce() -> LocalFut,
        LocalFut: Future<Output = OffsetsResult<T>>,
        Remote: FnOnce(NodeId) -> RemoteFut,
        RemoteFut: Future<Output = Result<T, ClusterError>>,
    {
        let leader = self.resolve_leader(partition).await?;
        if leader == self.cluster.local_node() {
            return local().await;
        }

        debug!(topic = %self.topic, %partition, %leader, "forwarding to partition leader");
        match remote(leader).await {
            Ok(response) => Ok(response),
            Err(err) => {
                self.leaders
                    .lock()
                    .expect("leader memo lock poisoned")
                    .forget(partition);
                Err(OffsetsError::Forwarding {
                    node: err.node(),
                    message: err.to_string(),
                })
            }
        }
    }
}

impl std::fmt::Debug for OffsetRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OffsetRouter").field("topic", &self.topic).finish_non_exhaustive()
    }
}
