//! Strata Storage - the storage-engine contract and an in-memory engine.
//!
//! The offset subsystem consumes storage through the [`MessageStore`]
//! trait: replicated append, key-indexed lookup, key-existence checks, and
//! range scans, per partition of a named topic. The production engine lives
//! outside this workspace; [`MemoryStore`] implements the same contract in
//! memory, including compacted-topic semantics, and is what the tests and
//! single-process deployments run against.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod error;
mod memory;
mod store;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use store::{MessageStore, ProduceReceipt, TopicKind, TopicMeta, TopicSpec};
