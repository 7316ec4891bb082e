//! Stored message records.
//!
//! A [`Record`] is what partitions store and what the offset subsystem
//! produces: an offset, a message key, a clustering key that orders cells
//! *within* a message key, and an opaque value. On a compacted topic the
//! pair (key, clustering key) identifies the one retained record.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::offset::{Offset, OFFSET_LEN};

/// A single stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Position of the record in its partition.
    pub offset: Offset,
    /// Message key. Compacted topics collapse records sharing a
    /// (key, clustering key) pair; may be empty on ordered topics.
    pub key: Bytes,
    /// Secondary ordering key within the message key; may be empty.
    pub clustering_key: Bytes,
    /// Opaque payload.
    pub value: Bytes,
}

impl Record {
    /// Creates a record with just an offset and value.
    #[must_use]
    pub fn new(offset: Offset, value: impl Into<Bytes>) -> Self {
        Self {
            offset,
            key: Bytes::new(),
            clustering_key: Bytes::new(),
            value: value.into(),
        }
    }

    /// Creates a keyed record.
    #[must_use]
    pub fn with_keys(
        offset: Offset,
        key: impl Into<Bytes>,
        clustering_key: impl Into<Bytes>,
        value: impl Into<Bytes>,
    ) -> Self {
        Self {
            offset,
            key: key.into(),
            clustering_key: clustering_key.into(),
            value: value.into(),
        }
    }

    /// Returns the approximate stored size of the record in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        OFFSET_LEN + 4 + self.key.len() + 4 + self.clustering_key.len() + 4 + self.value.len()
    }

    /// Encodes the record to bytes.
    #[allow(clippy::cast_possible_truncation)] // Sizes bounded by limits.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(self.offset.as_bytes());
        buf.put_u32_le(self.key.len() as u32);
        buf.put_slice(&self.key);
        buf.put_u32_le(self.clustering_key.len() as u32);
        buf.put_slice(&self.clustering_key);
        buf.put_u32_le(self.value.len() as u32);
        buf.put_slice(&self.value);
    }

    /// Decodes a record from bytes.
    ///
    /// # Errors
    /// Returns [`RecordCodecError::Truncated`] if the buffer ends early.
    pub fn decode(buf: &mut impl Buf) -> Result<Self, RecordCodecError> {
        if buf.remaining() < OFFSET_LEN {
            return Err(RecordCodecError::Truncated);
        }
        let mut offset_bytes = [0u8; OFFSET_LEN];
        buf.copy_to_slice(&mut offset_bytes);
        let offset = Offset::from_bytes(offset_bytes);

        let key = take_prefixed(buf)?;
        let clustering_key = take_prefixed(buf)?;
        let value = take_prefixed(buf)?;

        Ok(Self {
            offset,
            key,
            clustering_key,
            value,
        })
    }
}

fn take_prefixed(buf: &mut impl Buf) -> Result<Bytes, RecordCodecError> {
    if buf.remaining() < 4 {
        return Err(RecordCodecError::Truncated);
    }
    let len = buf.get_u32_le() as usize;
    if buf.remaining() < len {
        return Err(RecordCodecError::Truncated);
    }
    Ok(buf.copy_to_bytes(len))
}

/// Record codec errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordCodecError {
    /// The buffer ended before the record did.
    Truncated,
}

impl std::fmt::Display for RecordCodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Truncated => write!(f, "record truncated"),
        }
    }
}

impl std::error::Error for RecordCodecError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offset::OffsetGenerator;

    #[test]
    fn test_roundtrip() {
        let gen = OffsetGenerator::new();
        let original = Record::with_keys(gen.next(), "stream", "cell", "state");

        let mut buf = BytesMut::new();
        original.encode(&mut buf);

        let decoded = Record::decode(&mut buf.freeze()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_empty_keys_roundtrip() {
        let original = Record::new(Offset::NIL, "payload");

        let mut buf = BytesMut::new();
        original.encode(&mut buf);

        let decoded = Record::decode(&mut buf.freeze()).unwrap();
        assert!(decoded.key.is_empty());
        assert!(decoded.clustering_key.is_empty());
        assert_eq!(decoded.value, original.value);
    }

    #[test]
    fn test_truncated_buffer() {
        let original = Record::with_keys(Offset::MAX, "k", "ck", "v");
        let mut buf = BytesMut::new();
        original.encode(&mut buf);

        let truncated = buf.freeze().slice(..10);
        assert_eq!(
            Record::decode(&mut truncated.clone()),
            Err(RecordCodecError::Truncated)
        );
    }
}
