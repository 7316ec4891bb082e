//! Consumer progress marks.
//!
//! A *mark* is a durable record that a consumer group has reached a given
//! offset under a given [`MarkKind`]. Kinds are independent axes of progress
//! over the same offset space: acknowledging an offset says nothing about
//! the commit point and vice versa.

use bytes::{BufMut, Bytes, BytesMut};

/// The axis of progress a mark records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum MarkKind {
    /// The consumer has successfully processed this offset.
    #[default]
    Acknowledged = 1,
    /// The consumer failed to process this offset and wants redelivery.
    NotAcknowledged = 2,
    /// The safe resume point for the group on restart.
    Committed = 3,
    /// The offset was delivered, without any statement about processing.
    Consumed = 4,
}

/// All kinds, in declaration order.
pub(crate) const ALL_KINDS: [MarkKind; 4] = [
    MarkKind::Acknowledged,
    MarkKind::NotAcknowledged,
    MarkKind::Committed,
    MarkKind::Consumed,
];

impl MarkKind {
    /// Returns the wire byte for this kind.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Creates a kind from its wire byte.
    #[must_use]
    pub const fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Acknowledged),
            2 => Some(Self::NotAcknowledged),
            3 => Some(Self::Committed),
            4 => Some(Self::Consumed),
            _ => None,
        }
    }

    /// Returns every kind, in declaration order.
    #[must_use]
    pub const fn all() -> [Self; 4] {
        ALL_KINDS
    }

    /// Whether records of this kind are stored at the marked offset.
    ///
    /// Positional kinds answer "how far has this stream progressed", so
    /// their records carry the marked offset. `NotAcknowledged` is a
    /// redelivery signal, not a position, and its records get a freshly
    /// generated offset instead.
    #[must_use]
    pub const fn is_positional(self) -> bool {
        !matches!(self, Self::NotAcknowledged)
    }
}

/// Opaque per-mark metadata.
///
/// Carries the kind plus whatever payload the caller wants associated with
/// the mark. Stored as the value of the mark's record on the offset topic.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MarkState {
    /// The axis of progress this mark records.
    pub kind: MarkKind,
    /// Caller-supplied payload, opaque to the broker.
    pub payload: Bytes,
}

impl MarkState {
    /// Creates a state with an empty payload.
    #[must_use]
    pub const fn new(kind: MarkKind) -> Self {
        Self {
            kind,
            payload: Bytes::new(),
        }
    }

    /// Creates a state carrying a payload.
    #[must_use]
    pub fn with_payload(kind: MarkKind, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// Encodes the state: one kind byte followed by the raw payload.
    ///
    /// The encoding is never empty, so an empty stored value always means a
    /// malformed record rather than a tombstone.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(1 + self.payload.len());
        buf.put_u8(self.kind.as_byte());
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    /// Decodes a state from stored bytes.
    ///
    /// Returns `None` if the buffer is empty or the kind byte is unknown.
    #[must_use]
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let (&kind_byte, payload) = bytes.split_first()?;
        let kind = MarkKind::from_byte(kind_byte)?;
        Some(Self {
            kind,
            payload: Bytes::copy_from_slice(payload),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_byte_roundtrip() {
        for kind in MarkKind::all() {
            assert_eq!(MarkKind::from_byte(kind.as_byte()), Some(kind));
        }
        assert_eq!(MarkKind::from_byte(0), None);
        assert_eq!(MarkKind::from_byte(5), None);
    }

    #[test]
    fn test_only_not_acknowledged_is_non_positional() {
        assert!(MarkKind::Acknowledged.is_positional());
        assert!(MarkKind::Committed.is_positional());
        assert!(MarkKind::Consumed.is_positional());
        assert!(!MarkKind::NotAcknowledged.is_positional());
    }

    #[test]
    fn test_state_roundtrip() {
        let state = MarkState::with_payload(MarkKind::Committed, "attempt=3");
        let decoded = MarkState::decode(&state.encode()).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn test_empty_payload_encodes_to_one_byte() {
        let state = MarkState::new(MarkKind::Acknowledged);
        let encoded = state.encode();
        assert_eq!(encoded.len(), 1);
        assert_eq!(MarkState::decode(&encoded), Some(state));
    }

    #[test]
    fn test_decode_rejects_empty_and_unknown() {
        assert_eq!(MarkState::decode(&[]), None);
        assert_eq!(MarkState::decode(&[0xAB, 1, 2]), None);
    }
}
