//! Error types for cryptographic operations.

use thiserror::Error;

/// Result type alias for cryptographic operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Cryptographic operation errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Signature creation or verification failed.
    #[error("Signature operation failed: {0}")]
    Signature(String),

    /// MAC verification failed.
    #[error("MAC verification failed")]
    Mac,

    /// Key derivation failed.
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// AEAD encryption failed.
    #[error("AEAD encryption failed: {0}")]
    Encryption(String),

    /// AEAD decryption failed.
    #[error("AEAD decryption failed: {0}")]
    Decryption(String),

    /// Malformed or corrupted container.
    #[error("Invalid container: {0}")]
    InvalidContainer(String),

    /// Invalid key length.
    #[error("Invalid key length: {0}")]
    InvalidKeyLength(String),

    /// Invalid private key.
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Invalid public key.
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
}
