//! Cryptographic support library for the tsp secure session protocol.
//!
//! This crate provides the primitives the session core builds on:
//! - Container framing (tagged, length-prefixed, checksummed) used for every
//!   wire message and for key material at rest
//! - Key exchange (ephemeral ECDH over NIST P-256)
//! - Signatures (ECDSA P-256 over ordered context fragments)
//! - Key derivation (HKDF-SHA256 with label + context fragments)
//! - Message authentication (HMAC-SHA256 over ordered context fragments)
//! - AEAD encryption (AES-256-GCM with counter nonces)
//!
//! Security posture:
//! - No unsafe code
//! - All secrets use Zeroizing wrappers
//! - Constant-time tag comparisons via the hmac/subtle machinery
//! - No logging of key material (no logging at all in this crate)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aead;
pub mod container;
pub mod ecdh;
pub mod error;
pub mod kdf;
pub mod mac;
pub mod sign;

pub use error::{Error, Result};
