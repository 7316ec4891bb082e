//! In-memory storage engine.
//!
//! [`MemoryStore`] implements the full [`MessageStore`] contract in memory:
//! per-partition logs ordered by offset, a per-key clustering index for
//! key-indexed lookups, and compaction that keeps exactly one record per
//! (key, clustering key) pair on compacted topics.
//!
//! Clones share state via `Arc`, so a store handle can be handed to several
//! brokers in a test and behaves like one replicated engine. One-shot
//! forced-failure switches exercise error paths deterministically.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use strata_core::{Offset, PartitionId, Record};

use crate::error::{StorageError, StorageResult};
use crate::store::{MessageStore, ProduceReceipt, TopicKind, TopicMeta, TopicSpec};

/// Physical row identity within a partition.
///
/// Rows sort by offset first so scans stay offset-ordered; the insertion
/// sequence breaks ties, so two cells that happen to share an offset (the
/// same offset marked under two kinds, say) are distinct rows rather than
/// one clobbering the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct RowId {
    offset: Offset,
    seq: u64,
}

/// Per-partition state: the log plus the clustering index.
#[derive(Debug, Default)]
struct PartitionData {
    /// Records in offset order, tie-broken by insertion sequence.
    log: BTreeMap<RowId, Record>,
    /// key -> clustering key -> row of the retained record.
    index: BTreeMap<Bytes, BTreeMap<Bytes, RowId>>,
    /// Next insertion sequence.
    next_seq: u64,
}

#[derive(Debug)]
struct TopicState {
    meta: TopicMeta,
    partitions: HashMap<PartitionId, PartitionData>,
}

/// One-shot failure switches.
#[derive(Debug, Default)]
struct Faults {
    fail_next_produce: bool,
    fail_next_get: bool,
}

/// In-memory implementation of [`MessageStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    topics: Arc<Mutex<HashMap<String, TopicState>>>,
    faults: Arc<Mutex<Faults>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next produce call fail with an I/O error.
    ///
    /// # Panics
    /// Panics if the fault lock is poisoned.
    pub fn fail_next_produce(&self) {
        self.faults.lock().expect("faults lock poisoned").fail_next_produce = true;
    }

    /// Makes the next get call fail with an I/O error.
    ///
    /// # Panics
    /// Panics if the fault lock is poisoned.
    pub fn fail_next_get(&self) {
        self.faults.lock().expect("faults lock poisoned").fail_next_get = true;
    }

    /// Number of records currently retained in a partition.
    ///
    /// Bypasses faults; intended for assertions in tests.
    ///
    /// # Panics
    /// Panics if the topics lock is poisoned.
    #[must_use]
    pub fn record_count(&self, topic: &str, partition: PartitionId) -> usize {
        let topics = self.topics.lock().expect("topics lock poisoned");
        topics
            .get(topic)
            .and_then(|t| t.partitions.get(&partition))
            .map_or(0, |p| p.log.len())
    }

    fn take_fault(&self, which: fn(&mut Faults) -> &mut bool) -> bool {
        let mut faults = self.faults.lock().expect("faults lock poisoned");
        let flag = which(&mut faults);
        std::mem::take(flag)
    }
}

/// Smallest byte string greater than every string with this prefix, or
/// `None` if no such bound exists (empty or all-0xFF prefix).
fn prefix_end(prefix: &[u8]) -> Option<Bytes> {
    let mut end = prefix.to_vec();
    while let Some(&last) = end.last() {
        if last < 0xFF {
            *end.last_mut().expect("non-empty") = last + 1;
            return Some(Bytes::from(end));
        }
        end.pop();
    }
    None
}

/// Greatest clustering entry under `key` whose clustering key starts with
/// `prefix`.
fn greatest_under_prefix<'a>(
    cells: &'a BTreeMap<Bytes, RowId>,
    prefix: &[u8],
) -> Option<(&'a Bytes, &'a RowId)> {
    use std::ops::Bound;

    let lower = Bound::Included(Bytes::copy_from_slice(prefix));
    let upper = match prefix_end(prefix) {
        Some(end) => Bound::Excluded(end),
        None => Bound::Unbounded,
    };
    cells.range((lower, upper)).next_back()
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn create_topic(&self, spec: TopicSpec) -> StorageResult<bool> {
        let mut topics = self.topics.lock().expect("topics lock poisoned");
        if topics.contains_key(&spec.name) {
            return Ok(false);
        }

        let partition_ids: Vec<PartitionId> =
            (0..u64::from(spec.partitions)).map(PartitionId::new).collect();
        let partitions = partition_ids
            .iter()
            .map(|id| (*id, PartitionData::default()))
            .collect();

        topics.insert(
            spec.name.clone(),
            TopicState {
                meta: TopicMeta {
                    name: spec.name,
                    kind: spec.kind,
                    partitions: partition_ids,
                    replication: spec.replication,
                },
                partitions,
            },
        );
        Ok(true)
    }

    async fn topic(&self, name: &str) -> StorageResult<Option<TopicMeta>> {
        let topics = self.topics.lock().expect("topics lock poisoned");
        Ok(topics.get(name).map(|t| t.meta.clone()))
    }

    async fn produce(
        &self,
        topic: &str,
        partition: PartitionId,
        records: Vec<Record>,
    ) -> StorageResult<ProduceReceipt> {
        if self.take_fault(|f| &mut f.fail_next_produce) {
            return Err(StorageError::Io {
                operation: "produce",
                message: "forced failure".into(),
            });
        }

        let mut topics = self.topics.lock().expect("topics lock poisoned");
        let state = topics.get_mut(topic).ok_or_else(|| StorageError::TopicNotFound {
            topic: topic.to_string(),
        })?;
        let kind = state.meta.kind;
        if kind == TopicKind::Compacted && records.iter().any(|r| r.key.is_empty()) {
            return Err(StorageError::MissingKey {
                topic: topic.to_string(),
            });
        }
        let data = state.partitions.get_mut(&partition).ok_or_else(|| {
            StorageError::PartitionNotFound {
                topic: topic.to_string(),
                partition,
            }
        })?;

        // The batch is validated above; from here every record lands.
        #[allow(clippy::cast_possible_truncation)]
        let appended = records.len() as u32;
        for record in records {
            let row = RowId {
                offset: record.offset,
                seq: data.next_seq,
            };
            data.next_seq += 1;

            if !record.key.is_empty() {
                let cells = data.index.entry(record.key.clone()).or_default();
                let previous = cells.insert(record.clustering_key.clone(), row);
                if kind == TopicKind::Compacted {
                    if let Some(old_row) = previous {
                        data.log.remove(&old_row);
                    }
                }
            }
            data.log.insert(row, record);
        }

        Ok(ProduceReceipt { appended })
    }

    async fn get_message(
        &self,
        topic: &str,
        partition: PartitionId,
        key: &[u8],
        clustering_prefix: &[u8],
    ) -> StorageResult<Option<Record>> {
        if self.take_fault(|f| &mut f.fail_next_get) {
            return Err(StorageError::Io {
                operation: "get_message",
                message: "forced failure".into(),
            });
        }

        let topics = self.topics.lock().expect("topics lock poisoned");
        let state = topics.get(topic).ok_or_else(|| StorageError::TopicNotFound {
            topic: topic.to_string(),
        })?;
        let data = state.partitions.get(&partition).ok_or_else(|| {
            StorageError::PartitionNotFound {
                topic: topic.to_string(),
                partition,
            }
        })?;

        let Some(cells) = data.index.get(key) else {
            return Ok(None);
        };
        let found = greatest_under_prefix(cells, clustering_prefix)
            .and_then(|(_, row)| data.log.get(row))
            .cloned();
        Ok(found)
    }

    async fn has_key(
        &self,
        topic: &str,
        partition: PartitionId,
        key: &[u8],
        clustering_key: &[u8],
    ) -> StorageResult<bool> {
        let topics = self.topics.lock().expect("topics lock poisoned");
        let state = topics.get(topic).ok_or_else(|| StorageError::TopicNotFound {
            topic: topic.to_string(),
        })?;
        let data = state.partitions.get(&partition).ok_or_else(|| {
            StorageError::PartitionNotFound {
                topic: topic.to_string(),
                partition,
            }
        })?;

        Ok(data
            .index
            .get(key)
            .is_some_and(|cells| cells.contains_key(clustering_key)))
    }

    async fn range(
        &self,
        topic: &str,
        partition: PartitionId,
        from_exclusive: Offset,
        to_inclusive: Offset,
        max: u32,
    ) -> StorageResult<Vec<Record>> {
        use std::ops::Bound;

        let topics = self.topics.lock().expect("topics lock poisoned");
        let state = topics.get(topic).ok_or_else(|| StorageError::TopicNotFound {
            topic: topic.to_string(),
        })?;
        let data = state.partitions.get(&partition).ok_or_else(|| {
            StorageError::PartitionNotFound {
                topic: topic.to_string(),
                partition,
            }
        })?;

        // Sequences are tie-breakers below the offset, so excluding
        // (from, MAX) excludes every row at `from` and including
        // (to, MAX) keeps every row at `to`.
        let lower = Bound::Excluded(RowId {
            offset: from_exclusive,
            seq: u64::MAX,
        });
        let upper = Bound::Included(RowId {
            offset: to_inclusive,
            seq: u64::MAX,
        });
        let records = data
            .log
            .range((lower, upper))
            .take(max as usize)
            .map(|(_, record)| record.clone())
            .collect();
        Ok(records)
    }
}
