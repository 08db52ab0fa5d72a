//! Error kinds surfaced by the library.

/// Errors that can escape a collection operation.
///
/// Everything else is absorbed: out-of-range reads return "absent",
/// out-of-range writes and empty-structure pops return the same handle,
/// and stale-generation reads return "absent" (writes yield a fresh
/// empty handle).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backing memory cannot grow to satisfy an allocation.
    #[error("arena cannot grow past {limit} bytes")]
    OutOfMemory {
        /// Configured growth limit in bytes.
        limit: u32,
    },

    /// A nested-structure envelope carried a tag that is not in the
    /// registry.
    #[error("unknown structure kind {0:?}")]
    UnknownStructureKind(String),

    /// A key or value is too large for the packed-word encoding
    /// (length over 4095 bytes, or blob offset past the 20-bit range).
    ///
    /// Callers must segment payloads above this cap.
    #[error("payload of {len} bytes exceeds the packed-word cap")]
    PayloadTooLarge {
        /// Offending payload length in bytes.
        len: usize,
    },

    /// A nested-structure envelope or object value failed to parse.
    #[error("malformed value envelope")]
    Envelope(#[from] serde_json::Error),
}
