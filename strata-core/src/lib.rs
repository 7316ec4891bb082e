//! Strata Core - shared vocabulary for the Strata message broker.
//!
//! This crate holds the types every other Strata crate speaks:
//!
//! - **Typed identifiers**: `NodeId` and `PartitionId` newtypes that cannot
//!   be mixed up.
//! - **Offsets**: 16-byte, lexicographically sortable message positions with
//!   `NIL`/`MAX` sentinels and a monotonic generator.
//! - **Marks**: the kinds of consumer progress (`Acknowledged`, `Committed`,
//!   ...) and the opaque per-mark state stored with them.
//! - **Records**: the stored message shape (offset, key, clustering key,
//!   value) and its byte codec.
//! - **Requests**: the broker-to-broker request surface for the offset
//!   subsystem.
//! - **Limits**: explicit maxima for every request-shaped input.
//!
//! It deliberately contains no I/O: storage, cluster membership, and RPC
//! live behind traits in their own crates.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod api;
mod limits;
mod mark;
mod offset;
mod record;
mod types;

pub use api::{
    GetMarkRequest, GetMarkResponse, IsAcknowledgedRequest, IsAcknowledgedResponse,
    LastOffsetRequest, LastOffsetResponse, MarkRequest, MarkResponse,
};
pub use limits::Limits;
pub use mark::{MarkKind, MarkState};
pub use offset::{Offset, OffsetGenerator};
pub use record::{Record, RecordCodecError};
pub use types::{NodeId, PartitionId};
