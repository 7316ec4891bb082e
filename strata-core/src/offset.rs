//! Sortable message offsets.
//!
//! An [`Offset`] is a 16-byte identifier for a message's position in a
//! partition. Offsets compare bytewise, and the layout puts a millisecond
//! timestamp in the most significant bytes, so offsets generated by
//! different producers still sort roughly by creation time and "the maximum
//! offset seen" is meaningful across producers.
//!
//! Layout (big-endian throughout):
//!
//! ```text
//! [ 8 bytes timestamp-millis | 4 bytes sequence | 4 bytes entropy ]
//! ```
//!
//! Two sentinels bracket the real offsets: [`Offset::NIL`] (all zeroes,
//! before everything) and [`Offset::MAX`] (all `0xFF`, after everything).

use std::fmt;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

/// Number of bytes in an encoded offset.
pub const OFFSET_LEN: usize = 16;

/// A 16-byte, lexicographically comparable message offset.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Offset([u8; OFFSET_LEN]);

impl Offset {
    /// The sentinel smaller than every real offset.
    pub const NIL: Self = Self([0u8; OFFSET_LEN]);

    /// The sentinel larger than every real offset.
    pub const MAX: Self = Self([0xFF; OFFSET_LEN]);

    /// Creates an offset from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; OFFSET_LEN]) -> Self {
        Self(bytes)
    }

    /// Creates an offset from a byte slice.
    ///
    /// Returns `None` unless the slice is exactly [`OFFSET_LEN`] bytes.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; OFFSET_LEN] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Builds an offset from its components.
    #[must_use]
    pub fn from_parts(timestamp_ms: u64, sequence: u32, entropy: u32) -> Self {
        let mut bytes = [0u8; OFFSET_LEN];
        bytes[..8].copy_from_slice(&timestamp_ms.to_be_bytes());
        bytes[8..12].copy_from_slice(&sequence.to_be_bytes());
        bytes[12..].copy_from_slice(&entropy.to_be_bytes());
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; OFFSET_LEN] {
        &self.0
    }

    /// Returns the embedded millisecond timestamp.
    #[must_use]
    pub fn timestamp_ms(&self) -> u64 {
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&self.0[..8]);
        u64::from_be_bytes(ts)
    }

    /// Returns true if this is the [`Offset::NIL`] sentinel.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        *self == Self::NIL
    }
}

impl fmt::Debug for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Offset({self})")
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Generator state: the last (timestamp, sequence) pair handed out.
#[derive(Debug, Clone, Copy)]
struct GeneratorState {
    last_ms: u64,
    sequence: u32,
}

/// Produces strictly increasing offsets.
///
/// A generator stamps each offset with the current wall-clock millisecond;
/// offsets produced within the same millisecond are ordered by an
/// incrementing sequence. The entropy tail keeps offsets from independent
/// generators distinct.
///
/// The generator is safe to share across tasks.
#[derive(Debug)]
pub struct OffsetGenerator {
    state: Mutex<GeneratorState>,
}

impl OffsetGenerator {
    /// Creates a new generator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GeneratorState {
                last_ms: 0,
                sequence: 0,
            }),
        }
    }

    /// Returns the next offset, strictly greater than every offset this
    /// generator has returned before.
    ///
    /// # Panics
    ///
    /// Panics if the generator lock is poisoned.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // Millis fit in u64 for the foreseeable future.
    pub fn next(&self) -> Offset {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        let mut state = self.state.lock().expect("generator lock poisoned");
        if now_ms > state.last_ms {
            state.last_ms = now_ms;
            state.sequence = 0;
        } else {
            // Clock stalled or went backwards: stay on the last timestamp
            // and keep incrementing the sequence to preserve ordering.
            state.sequence += 1;
        }

        let entropy = rand::thread_rng().gen::<u32>();
        Offset::from_parts(state.last_ms, state.sequence, entropy)
    }
}

impl Default for OffsetGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_bracket_real_offsets() {
        let gen = OffsetGenerator::new();
        let offset = gen.next();
        assert!(Offset::NIL < offset);
        assert!(offset < Offset::MAX);
        assert!(Offset::NIL.is_nil());
        assert!(!offset.is_nil());
    }

    #[test]
    fn test_generator_is_monotonic() {
        let gen = OffsetGenerator::new();
        let mut prev = Offset::NIL;
        for _ in 0..1000 {
            let next = gen.next();
            assert!(next > prev, "offsets must be strictly increasing");
            prev = next;
        }
    }

    #[test]
    fn test_ordering_is_timestamp_first() {
        let early = Offset::from_parts(1_000, u32::MAX, u32::MAX);
        let late = Offset::from_parts(1_001, 0, 0);
        assert!(early < late);
    }

    #[test]
    fn test_from_parts_roundtrip() {
        let offset = Offset::from_parts(1_234_567, 42, 7);
        assert_eq!(offset.timestamp_ms(), 1_234_567);

        let restored = Offset::from_slice(offset.as_bytes()).unwrap();
        assert_eq!(restored, offset);
    }

    #[test]
    fn test_from_slice_rejects_bad_lengths() {
        assert!(Offset::from_slice(&[0u8; 15]).is_none());
        assert!(Offset::from_slice(&[0u8; 17]).is_none());
        assert!(Offset::from_slice(&[0u8; 16]).is_some());
    }

    #[test]
    fn test_display_is_hex() {
        assert_eq!(Offset::NIL.to_string(), "0".repeat(32));
        assert_eq!(Offset::MAX.to_string(), "f".repeat(32));
    }
}
