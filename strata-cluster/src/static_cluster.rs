//! In-memory cluster view.
//!
//! [`StaticCluster`] stands in for the membership collaborator: an
//! externally mutated leader table plus a fixed local identity. Production
//! deployments implement [`ClusterView`] over the real membership layer;
//! tests and single-process brokers use this.

use std::collections::HashMap;

use async_trait::async_trait;
use strata_core::{NodeId, PartitionId};
use tokio::sync::RwLock;

use crate::view::ClusterView;

/// A cluster view backed by a plain leader table.
///
/// Clones are not provided; share it via `Arc`. The table is read-mostly:
/// the offset subsystem only reads, while whoever plays the membership role
/// calls [`set_leader`](Self::set_leader) and
/// [`clear_leader`](Self::clear_leader).
#[derive(Debug)]
pub struct StaticCluster {
    local: NodeId,
    leaders: RwLock<HashMap<(String, PartitionId), NodeId>>,
}

impl StaticCluster {
    /// Creates a view for a broker named `local` with an empty leader table.
    #[must_use]
    pub fn new(local: NodeId) -> Self {
        Self {
            local,
            leaders: RwLock::new(HashMap::new()),
        }
    }

    /// Records `node` as the leader of `(topic, partition)`.
    pub async fn set_leader(&self, topic: &str, partition: PartitionId, node: NodeId) {
        let mut leaders = self.leaders.write().await;
        leaders.insert((topic.to_string(), partition), node);
    }

    /// Removes any known leader for `(topic, partition)`.
    pub async fn clear_leader(&self, topic: &str, partition: PartitionId) {
        let mut leaders = self.leaders.write().await;
        leaders.remove(&(topic.to_string(), partition));
    }
}

#[async_trait]
impl ClusterView for StaticCluster {
    fn local_node(&self) -> NodeId {
        self.local
    }

    async fn leader_of(&self, topic: &str, partition: PartitionId) -> Option<NodeId> {
        let leaders = self.leaders.read().await;
        leaders.get(&(topic.to_string(), partition)).copied()
    }
}
