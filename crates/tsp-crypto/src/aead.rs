//! AEAD encryption (AES-256-GCM per NIST SP 800-38D).
//!
//! The record layer encrypts one message per invocation under a per-direction
//! key, with a counter-derived nonce and the session binding carried in the
//! additional authenticated data.

use crate::{Error, Result};
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use zeroize::Zeroizing;

/// Length of the authentication tag appended to every ciphertext.
pub const AEAD_TAG_SIZE: usize = 16;

/// Length of an AEAD nonce.
pub const NONCE_SIZE: usize = 12;

/// Construct an AEAD nonce from a message counter.
///
/// - `nonce[0..4]` = zero (fixed)
/// - `nonce[4..12]` = counter, big-endian
///
/// Counters are per-direction and never reused under the same key.
pub fn construct_nonce(counter: u64) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    nonce[4..12].copy_from_slice(&counter.to_be_bytes());
    nonce
}

/// Encrypt with AES-256-GCM.
///
/// Returns ciphertext with the 16-byte authentication tag appended.
///
/// # Errors
///
/// Returns `Error::Encryption` on an invalid key or cipher failure.
pub fn aes256gcm_encrypt(
    key: &[u8; 32],
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| Error::Encryption("invalid AES-256-GCM key length".into()))?;

    let payload = Payload {
        msg: plaintext,
        aad,
    };

    cipher
        .encrypt(Nonce::from_slice(nonce), payload)
        .map_err(|_| Error::Encryption("AES-256-GCM encryption failed".into()))
}

/// Decrypt with AES-256-GCM, verifying the appended tag.
///
/// # Errors
///
/// Returns `Error::Decryption` if tag verification fails.
pub fn aes256gcm_decrypt(
    key: &[u8; 32],
    nonce: &[u8; NONCE_SIZE],
    ciphertext_and_tag: &[u8],
    aad: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| Error::Decryption("invalid AES-256-GCM key length".into()))?;

    let payload = Payload {
        msg: ciphertext_and_tag,
        aad,
    };

    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), payload)
        .map_err(|_| Error::Decryption("AES-256-GCM authentication failed".into()))?;

    Ok(Zeroizing::new(plaintext))
}
