//! Strata Offsets - the consumer offset subsystem.
//!
//! Consumers record their progress as *marks*: durable statements that a
//! (topic, partition, consumer group) stream has reached a given offset
//! under a given kind (`Acknowledged`, `Committed`, ...). Marks are ordinary
//! records on a reserved, compacted internal topic, so the broker's own
//! storage and replication make progress durable; this crate is a client of
//! the broker that hosts it.
//!
//! # Shape of the subsystem
//!
//! - [`keys`]: deterministic byte encodings of a stream's identity and of a
//!   (offset, kind) cell within it.
//! - [`OffsetTopic`]: the reserved compacted topic and the stable
//!   stream-to-partition mapping.
//! - [`OffsetRouter`]: resolves the partition leader and dispatches a
//!   request locally or forwards it, exactly once.
//! - [`OffsetManager`]: the public operations - mark recording, last-offset
//!   and mark-state queries, acknowledgement probes, consumer resume, and
//!   the bootstrap guard.
//!
//! # Ordering and idempotence
//!
//! A mark of the same (stream, offset, kind) overwrites itself: the cell
//! key is deterministic and the compacted topic retains one record per
//! cell. "Last offset of kind K" is a single key-indexed lookup because
//! cell keys sort by offset within a kind.
//!
//! # Cancellation
//!
//! Every operation is an async fn; dropping the future cancels the
//! operation. A cancelled mark may or may not have been durably recorded -
//! callers resolve the ambiguity by retrying (safe, idempotent) or querying
//! [`OffsetManager::last_offset`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod bootstrap;
mod config;
mod error;
pub mod keys;
mod manager;
mod resume;
mod router;
#[cfg(test)]
mod testing;
mod topic;

pub use config::{OffsetsConfig, OFFSET_TOPIC_NAME};
pub use error::{OffsetsError, OffsetsResult};
pub use manager::OffsetManager;
pub use resume::ResumePoint;
pub use router::OffsetRouter;
pub use topic::OffsetTopic;
