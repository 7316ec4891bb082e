//! Offset subsystem configuration.

use std::time::Duration;

use strata_core::Limits;

/// The reserved internal topic every broker stores marks on.
pub const OFFSET_TOPIC_NAME: &str = "__consumer_offsets";

/// Configuration for the offset subsystem.
#[derive(Debug, Clone)]
pub struct OffsetsConfig {
    /// Name of the internal offset topic.
    pub topic: String,
    /// Partition count of the offset topic. Fixed after creation.
    pub partitions: u32,
    /// Replication factor of the offset topic. Fixed after creation.
    pub replication: u32,
    /// How often the bootstrap guard re-checks for partition leaders.
    pub ready_poll_interval: Duration,
    /// How long a resolved partition leader is served without
    /// re-consulting the cluster view.
    pub leader_ttl: Duration,
    /// Bounds on request-shaped input.
    pub limits: Limits,
}

impl Default for OffsetsConfig {
    fn default() -> Self {
        Self {
            topic: OFFSET_TOPIC_NAME.to_string(),
            partitions: 8,
            replication: 3,
            ready_poll_interval: Duration::from_millis(100),
            leader_ttl: Duration::from_secs(5),
            limits: Limits::new(),
        }
    }
}

impl OffsetsConfig {
    /// Configuration for tests: few partitions, fast polling.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            topic: OFFSET_TOPIC_NAME.to_string(),
            partitions: 3,
            replication: 2,
            ready_poll_interval: Duration::from_millis(10),
            leader_ttl: Duration::from_secs(5),
            limits: Limits::new(),
        }
    }
}
