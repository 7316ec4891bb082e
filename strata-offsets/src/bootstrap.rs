//! Bootstrap guard for the offset topic.
//!
//! The offset subsystem is a client of the broker that hosts it, so the
//! internal topic must exist and have elected leaders before any mark or
//! query can proceed. [`OffsetManager::bootstrap`] creates the topic
//! idempotently; [`OffsetManager::wait_until_ready`] delays until every
//! partition has a live leader. Operations issued before readiness fail
//! through routing with `NoLeaderFound` rather than touching storage.

use std::time::Duration;

use strata_core::PartitionId;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::{OffsetsError, OffsetsResult};
use crate::manager::OffsetManager;

impl OffsetManager {
    /// Creates the internal offset topic if it does not exist.
    ///
    /// Safe to call on every broker at every startup.
    ///
    /// # Errors
    /// Returns an error if the storage engine rejects the creation.
    pub async fn bootstrap(&self) -> OffsetsResult<()> {
        self.topic
            .ensure_created(self.config.partitions, self.config.replication)
            .await?;
        info!(topic = %self.config.topic, partitions = self.config.partitions, "offset topic ready for leaders");
        Ok(())
    }

    /// Waits until every partition of the offset topic has a live leader.
    ///
    /// Polls the cluster view at the configured interval. On deadline the
    /// error names the first partition still without a leader.
    ///
    /// # Errors
    /// Returns [`OffsetsError::NoLeaderFound`] on deadline, or
    /// [`OffsetsError::TopicNotFound`] if the topic was never created.
    pub async fn wait_until_ready(&self, timeout: Duration) -> OffsetsResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.leaderless_partition().await? {
                None => {
                    info!(topic = %self.config.topic, "offset topic has leaders for every partition");
                    return Ok(());
                }
                Some(partition) => {
                    if Instant::now() >= deadline {
                        return Err(OffsetsError::NoLeaderFound {
                            topic: self.config.topic.clone(),
                            partition,
                        });
                    }
                    debug!(topic = %self.config.topic, %partition, "waiting for partition leader");
                    tokio::time::sleep(self.config.ready_poll_interval).await;
                }
            }
        }
    }

    /// The first offset-topic partition without a live leader, if any.
    ///
    /// Consults the cluster view directly; readiness must not be answered
    /// from a stale cache.
    async fn leaderless_partition(&self) -> OffsetsResult<Option<PartitionId>> {
        for partition in self.topic.partitions().await? {
            if self
                .cluster
                .leader_of(&self.config.topic, partition)
                .await
                .is_none()
            {
                return Ok(Some(partition));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OffsetsConfig, OFFSET_TOPIC_NAME};
    use crate::testing::NoForward;
    use std::sync::Arc;
    use strata_cluster::StaticCluster;
    use strata_core::NodeId;
    use strata_storage::{MemoryStore, MessageStore};

    fn manager_on(store: &MemoryStore, cluster: &Arc<StaticCluster>) -> OffsetManager {
        OffsetManager::new(
            Arc::new(store.clone()),
            Arc::clone(cluster) as Arc<dyn strata_cluster::ClusterView>,
            Arc::new(NoForward),
            OffsetsConfig::for_testing(),
        )
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let store = MemoryStore::new();
        let cluster = Arc::new(StaticCluster::new(NodeId::new(1)));
        let manager = manager_on(&store, &cluster);

        manager.bootstrap().await.unwrap();
        manager.bootstrap().await.unwrap();

        assert!(store.topic(OFFSET_TOPIC_NAME).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_ready_before_bootstrap_reports_missing_topic() {
        let store = MemoryStore::new();
        let cluster = Arc::new(StaticCluster::new(NodeId::new(1)));
        let manager = manager_on(&store, &cluster);

        let err = manager.wait_until_ready(Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, OffsetsError::TopicNotFound { .. }));
    }

    #[tokio::test]
    async fn test_ready_times_out_without_leaders() {
        let store = MemoryStore::new();
        let cluster = Arc::new(StaticCluster::new(NodeId::new(1)));
        let manager = manager_on(&store, &cluster);
        manager.bootstrap().await.unwrap();

        let err = manager.wait_until_ready(Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, OffsetsError::NoLeaderFound { .. }));
    }

    #[tokio::test]
    async fn test_ready_once_leaders_appear() {
        let store = MemoryStore::new();
        let cluster = Arc::new(StaticCluster::new(NodeId::new(1)));
        let manager = manager_on(&store, &cluster);
        manager.bootstrap().await.unwrap();

        // Leaders arrive while the guard is polling.
        let elect = Arc::clone(&cluster);
        let elector = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            for p in 0..3 {
                elect
                    .set_leader(OFFSET_TOPIC_NAME, strata_core::PartitionId::new(p), NodeId::new(1))
                    .await;
            }
        });

        manager.wait_until_ready(Duration::from_secs(2)).await.unwrap();
        elector.await.unwrap();
    }
}
