//! Broker-to-broker request surface of the offset subsystem.
//!
//! These types cross node boundaries: a broker that is not the leader of
//! the offset-topic partition owning a stream forwards the request
//! unchanged to the leader and relays the response verbatim. The transport
//! itself is a collaborator behind a trait; these are just the shapes.

use crate::mark::{MarkKind, MarkState};
use crate::offset::Offset;
use crate::record::Record;
use crate::types::PartitionId;

/// Request to record one or more marks of the same kind on a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkRequest {
    /// Topic the consumer is reading.
    pub topic: String,
    /// Partition the consumer is reading.
    pub partition: PartitionId,
    /// Consumer group recording progress.
    pub consumer_group: String,
    /// Offsets to mark. May be empty, in which case the request is a no-op.
    pub offsets: Vec<Offset>,
    /// Per-mark state. Absent state defaults to an empty
    /// [`MarkState`] at the recording broker.
    pub state: Option<MarkState>,
}

impl MarkRequest {
    /// The kind this request records.
    #[must_use]
    pub fn kind(&self) -> MarkKind {
        self.state.as_ref().map(|s| s.kind).unwrap_or_default()
    }
}

/// Response to a [`MarkRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkResponse {
    /// Whether the batch was accepted for replication.
    pub success: bool,
}

/// Request for the last offset of a kind on a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastOffsetRequest {
    /// Topic of the stream.
    pub topic: String,
    /// Partition of the stream.
    pub partition: PartitionId,
    /// Consumer group of the stream.
    pub consumer_group: String,
    /// Which axis of progress to read.
    pub kind: MarkKind,
}

/// Response to a [`LastOffsetRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastOffsetResponse {
    /// The greatest offset ever marked with the requested kind, or
    /// [`Offset::NIL`] if the stream has no such mark.
    pub offset: Offset,
}

/// Request for the stored record of a specific marked offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetMarkRequest {
    /// Topic of the stream.
    pub topic: String,
    /// Partition of the stream.
    pub partition: PartitionId,
    /// Consumer group of the stream.
    pub consumer_group: String,
    /// The marked offset to look up.
    pub offset: Offset,
}

/// Request asking whether a specific offset carries an Acknowledged mark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsAcknowledgedRequest {
    /// Topic of the stream.
    pub topic: String,
    /// Partition of the stream.
    pub partition: PartitionId,
    /// Consumer group of the stream.
    pub consumer_group: String,
    /// The offset to check.
    pub offset: Offset,
}

/// Response to an [`IsAcknowledgedRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsAcknowledgedResponse {
    /// True iff an Acknowledged mark exists for the offset.
    pub acknowledged: bool,
}

/// Response to a [`GetMarkRequest`] is the stored [`Record`] itself.
pub type GetMarkResponse = Record;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_request_kind_defaults() {
        let req = MarkRequest {
            topic: "payments".into(),
            partition: PartitionId::new(0),
            consumer_group: "group1".into(),
            offsets: vec![],
            state: None,
        };
        assert_eq!(req.kind(), MarkKind::Acknowledged);

        let req = MarkRequest {
            state: Some(MarkState::new(MarkKind::Committed)),
            ..req
        };
        assert_eq!(req.kind(), MarkKind::Committed);
    }
}
