//! Deterministic key encodings for the offset topic.
//!
//! Two keys identify every stored mark:
//!
//! - The **stream key** names a progress stream: the tuple
//!   (topic, partition, consumer group), prefixed with the constant
//!   namespace [`STREAM_KEY_PREFIX`] so offset records cannot collide with
//!   anything else sharing the topic. Equal tuples encode to equal bytes.
//! - The **cell key** names one marked offset within a stream: one kind
//!   byte followed by the 16 offset bytes. Within a fixed kind, bytewise
//!   order is offset order, so "the greatest cell with prefix `[kind]`" is
//!   "the last offset of that kind".
//!
//! Both encodings round-trip. Encoding can only fail on malformed input
//! (empty or oversized components), which is a programming error: the
//! caller's policy is to treat [`EncodingError`] as fatal in production
//! while tests observe the value.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use strata_core::{MarkKind, Offset, PartitionId};
use thiserror::Error;

/// Namespace prefix of every stream key.
pub const STREAM_KEY_PREFIX: &str = "offsets";

/// Longest allowed topic or group component, in bytes.
const COMPONENT_LEN_MAX: usize = u16::MAX as usize;

/// Length of an encoded cell key: one kind byte plus the offset bytes.
pub const CELL_KEY_LEN: usize = 1 + 16;

/// Key encoding/decoding errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// A key component was empty.
    #[error("empty {component} in stream key")]
    EmptyComponent {
        /// Which component was empty.
        component: &'static str,
    },

    /// A key component exceeded the representable length.
    #[error("{component} too long: {len} > {max} bytes")]
    ComponentTooLong {
        /// Which component was too long.
        component: &'static str,
        /// Actual length in bytes.
        len: usize,
        /// Maximum representable length.
        max: usize,
    },

    /// The bytes do not decode as a key of the expected shape.
    #[error("malformed key: {reason}")]
    Malformed {
        /// What was wrong.
        reason: &'static str,
    },
}

/// A decoded stream identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamKey {
    /// Topic the consumer reads.
    pub topic: String,
    /// Partition the consumer reads.
    pub partition: PartitionId,
    /// Consumer group recording progress.
    pub consumer_group: String,
}

/// Encodes a stream identity to its canonical bytes.
///
/// Layout: length-prefixed namespace, length-prefixed topic, 8-byte
/// partition, length-prefixed group. Equal tuples produce equal bytes and
/// unequal tuples produce unequal bytes (length prefixes prevent component
/// boundaries from shifting).
///
/// # Errors
/// Returns [`EncodingError`] if the topic or group is empty or longer than
/// a length prefix can represent.
pub fn encode_stream_key(
    topic: &str,
    partition: PartitionId,
    consumer_group: &str,
) -> Result<Bytes, EncodingError> {
    check_component("topic", topic)?;
    check_component("consumer group", consumer_group)?;

    let mut buf = BytesMut::with_capacity(
        2 + STREAM_KEY_PREFIX.len() + 2 + topic.len() + 8 + 2 + consumer_group.len(),
    );
    put_component(&mut buf, STREAM_KEY_PREFIX);
    put_component(&mut buf, topic);
    buf.put_u64_le(partition.get());
    put_component(&mut buf, consumer_group);
    Ok(buf.freeze())
}

/// Decodes a stream key produced by [`encode_stream_key`].
///
/// # Errors
/// Returns [`EncodingError::Malformed`] if the bytes are truncated, carry
/// the wrong namespace, or contain invalid UTF-8.
pub fn decode_stream_key(bytes: &[u8]) -> Result<StreamKey, EncodingError> {
    let mut buf = bytes;
    let prefix = take_component(&mut buf)?;
    if prefix != STREAM_KEY_PREFIX {
        return Err(EncodingError::Malformed {
            reason: "wrong namespace prefix",
        });
    }
    let topic = take_component(&mut buf)?;
    if buf.remaining() < 8 {
        return Err(EncodingError::Malformed {
            reason: "truncated partition",
        });
    }
    let partition = PartitionId::new(buf.get_u64_le());
    let consumer_group = take_component(&mut buf)?;
    if buf.has_remaining() {
        return Err(EncodingError::Malformed {
            reason: "trailing bytes",
        });
    }

    Ok(StreamKey {
        topic,
        partition,
        consumer_group,
    })
}

/// Encodes a (offset, kind) cell key.
///
/// The kind byte comes first so a one-byte prefix selects a kind, and the
/// big-endian offset bytes follow so cells of one kind sort by offset.
#[must_use]
pub fn encode_cell_key(offset: Offset, kind: MarkKind) -> Bytes {
    let mut buf = BytesMut::with_capacity(CELL_KEY_LEN);
    buf.put_u8(kind.as_byte());
    buf.put_slice(offset.as_bytes());
    buf.freeze()
}

/// Decodes a cell key produced by [`encode_cell_key`].
///
/// # Errors
/// Returns [`EncodingError::Malformed`] on a wrong length or unknown kind.
pub fn decode_cell_key(bytes: &[u8]) -> Result<(Offset, MarkKind), EncodingError> {
    if bytes.len() != CELL_KEY_LEN {
        return Err(EncodingError::Malformed {
            reason: "wrong cell key length",
        });
    }
    let kind = MarkKind::from_byte(bytes[0]).ok_or(EncodingError::Malformed {
        reason: "unknown mark kind",
    })?;
    let offset = Offset::from_slice(&bytes[1..]).ok_or(EncodingError::Malformed {
        reason: "wrong offset length",
    })?;
    Ok((offset, kind))
}

/// The one-byte clustering prefix selecting every cell of a kind.
#[must_use]
pub const fn kind_prefix(kind: MarkKind) -> [u8; 1] {
    [kind.as_byte()]
}

fn check_component(name: &'static str, value: &str) -> Result<(), EncodingError> {
    if value.is_empty() {
        return Err(EncodingError::EmptyComponent { component: name });
    }
    if value.len() > COMPONENT_LEN_MAX {
        return Err(EncodingError::ComponentTooLong {
            component: name,
            len: value.len(),
            max: COMPONENT_LEN_MAX,
        });
    }
    Ok(())
}

#[allow(clippy::cast_possible_truncation)] // Length checked against COMPONENT_LEN_MAX.
fn put_component(buf: &mut BytesMut, value: &str) {
    buf.put_u16_le(value.len() as u16);
    buf.put_slice(value.as_bytes());
}

fn take_component(buf: &mut &[u8]) -> Result<String, EncodingError> {
    if buf.remaining() < 2 {
        return Err(EncodingError::Malformed {
            reason: "truncated length prefix",
        });
    }
    let len = buf.get_u16_le() as usize;
    if buf.remaining() < len {
        return Err(EncodingError::Malformed {
            reason: "truncated component",
        });
    }
    let raw = buf.copy_to_bytes(len);
    String::from_utf8(raw.to_vec()).map_err(|_| EncodingError::Malformed {
        reason: "component is not UTF-8",
    })
}
