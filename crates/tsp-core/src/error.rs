//! Error types for session operations.

use thiserror::Error;

/// Result type alias for session operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Session operation errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed frame, failed checksum, unknown identity, wrong state, or
    /// signature/MAC mismatch. The single rejection code for everything an
    /// attacker can influence.
    #[error("Invalid parameter")]
    InvalidParameter,

    /// The caller-provided buffer cannot hold the output.
    #[error("Buffer too small: {needed} bytes needed")]
    BufferTooSmall {
        /// Required buffer length in bytes.
        needed: usize,
    },

    /// Transport callback failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// Cryptographic error (not an authentication failure).
    #[error("Crypto error: {0}")]
    Crypto(#[from] tsp_crypto::Error),
}
