//! Bounds on request-shaped input.
//!
//! Every externally supplied collection or byte string has an explicit
//! maximum. This keeps a misbehaving client from turning one mark request
//! into an unbounded produce batch.

/// Limits for the offset subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum offsets in a single mark request.
    pub max_marks_per_request: u32,
    /// Maximum length of a topic, partition, or group name in bytes.
    pub max_name_bytes: u32,
    /// Maximum length of a mark state payload in bytes.
    pub max_state_payload_bytes: u32,
    /// Maximum records returned by one consume call.
    pub max_records_per_fetch: u32,
}

impl Limits {
    /// Creates limits with safe defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_marks_per_request: 10_000,
            max_name_bytes: 1024,
            max_state_payload_bytes: 64 * 1024,
            max_records_per_fetch: 10_000,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::new()
    }
}
