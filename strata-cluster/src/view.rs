//! The cluster as seen by a single broker.
//!
//! [`ClusterView`] answers leadership questions; [`PeerTransport`] carries
//! offset-subsystem requests to another broker. Both are implemented by the
//! membership and RPC layers in production and by in-memory stand-ins in
//! tests.

use async_trait::async_trait;
use strata_core::{
    GetMarkRequest, IsAcknowledgedRequest, IsAcknowledgedResponse, LastOffsetRequest,
    LastOffsetResponse, MarkRequest, MarkResponse, NodeId, PartitionId, Record,
};

use crate::error::ClusterResult;

/// Leadership and identity, as maintained by the membership collaborator.
///
/// The view is a mostly-read structure; the offset subsystem only reads it
/// and takes whatever consistency the membership layer provides. A lookup
/// may suspend while leadership is in flux.
#[async_trait]
pub trait ClusterView: Send + Sync {
    /// The name of this broker.
    fn local_node(&self) -> NodeId;

    /// The node currently leading `(topic, partition)`, or `None` if no
    /// live leader is known.
    async fn leader_of(&self, topic: &str, partition: PartitionId) -> Option<NodeId>;
}

/// Carries offset-subsystem requests to a remote broker.
///
/// One method per forwarded request. Implementations relay the remote
/// handler's answer verbatim; remote handler failures surface as
/// [`ClusterError::Remote`](crate::ClusterError::Remote) with the remote
/// error text.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Forwards a mark request.
    ///
    /// # Errors
    /// Returns an error if the peer is unreachable or its handler failed.
    async fn mark(&self, node: NodeId, request: MarkRequest) -> ClusterResult<MarkResponse>;

    /// Forwards a last-offset query.
    ///
    /// # Errors
    /// Returns an error if the peer is unreachable or its handler failed.
    async fn last_offset(
        &self,
        node: NodeId,
        request: LastOffsetRequest,
    ) -> ClusterResult<LastOffsetResponse>;

    /// Forwards a mark-state lookup. `Ok(None)` relays the remote
    /// not-found answer.
    ///
    /// # Errors
    /// Returns an error if the peer is unreachable or its handler failed.
    async fn get_mark_state(
        &self,
        node: NodeId,
        request: GetMarkRequest,
    ) -> ClusterResult<Option<Record>>;

    /// Forwards an acknowledgement probe.
    ///
    /// # Errors
    /// Returns an error if the peer is unreachable or its handler failed.
    async fn is_acknowledged(
        &self,
        node: NodeId,
        request: IsAcknowledgedRequest,
    ) -> ClusterResult<IsAcknowledgedResponse>;
}
