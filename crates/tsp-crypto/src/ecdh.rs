//! Ephemeral ECDH key exchange over NIST P-256.
//!
//! One keypair is generated per session and destroyed with it. Public keys
//! travel as `UEC2` containers wrapping the uncompressed SEC1 point
//! (0x04 ‖ x ‖ y, 65 bytes), so the exported form can be dropped straight
//! into a wire message or a signature transcript.
//!
//! # Security
//!
//! - Private keys and shared secrets are cleared from memory on drop
//!   (`SecretKey`'s own zeroization plus `Zeroizing` on derived output).
//! - Peer public keys are validated as on-curve points before use.

use crate::container::{self, ContainerRef, EC_PUB_KEY_TAG};
use crate::{Error, Result};
use p256::ecdh::diffie_hellman;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use zeroize::Zeroizing;

/// Length of an uncompressed SEC1 P-256 point.
pub const EC_POINT_SIZE: usize = 65;

/// Length of a derived ECDH shared secret.
pub const SHARED_SECRET_SIZE: usize = 32;

/// Ephemeral P-256 keypair for Diffie-Hellman key agreement.
pub struct EcdhKeyPair {
    /// Secret scalar, zeroed on drop.
    secret_key: SecretKey,
    /// Public key as a sealed `UEC2` container, cached.
    public_container: Vec<u8>,
}

impl EcdhKeyPair {
    /// Generate a new random P-256 keypair.
    pub fn generate() -> Result<Self> {
        let secret_key = SecretKey::random(&mut rand::rngs::OsRng);
        Ok(Self::from_secret(secret_key))
    }

    /// Create a keypair from an existing 32-byte private scalar.
    ///
    /// Used for tests with known vectors.
    ///
    /// # Errors
    ///
    /// Returns an error if the scalar is not a valid P-256 private key.
    pub fn from_private(private_key: &[u8]) -> Result<Self> {
        if private_key.len() != 32 {
            return Err(Error::InvalidKeyLength(format!(
                "P-256 private key must be 32 bytes, got {}",
                private_key.len()
            )));
        }
        let secret_key = SecretKey::from_slice(private_key)
            .map_err(|_| Error::InvalidPrivateKey("invalid P-256 private scalar".into()))?;
        Ok(Self::from_secret(secret_key))
    }

    fn from_secret(secret_key: SecretKey) -> Self {
        let point = secret_key.public_key().to_encoded_point(false);
        let public_container = container::seal(EC_PUB_KEY_TAG, point.as_bytes());
        Self {
            secret_key,
            public_container,
        }
    }

    /// The public key as a sealed `UEC2` container.
    pub fn public_key_container(&self) -> &[u8] {
        &self.public_container
    }

    /// Perform key agreement against a peer's `UEC2` public key container.
    ///
    /// Returns the 32-byte shared secret (x-coordinate of the result point).
    ///
    /// # Errors
    ///
    /// Returns an error if the container is malformed, the payload is not an
    /// uncompressed SEC1 point, or the point is not on the curve.
    pub fn exchange(&self, peer_container: &[u8]) -> Result<Zeroizing<[u8; SHARED_SECRET_SIZE]>> {
        let peer_public = parse_public_key(peer_container)?;

        let shared = diffie_hellman(self.secret_key.to_nonzero_scalar(), peer_public.as_affine());

        let mut result = [0u8; SHARED_SECRET_SIZE];
        result.copy_from_slice(shared.raw_secret_bytes().as_slice());
        Ok(Zeroizing::new(result))
    }
}

/// Parse a `UEC2` container into a validated P-256 public key.
pub(crate) fn parse_public_key(key_container: &[u8]) -> Result<PublicKey> {
    let parsed = ContainerRef::parse_expecting(EC_PUB_KEY_TAG, key_container)?;
    let point = parsed.payload();

    if point.len() != EC_POINT_SIZE {
        return Err(Error::InvalidKeyLength(format!(
            "P-256 public key must be {} bytes (uncompressed), got {}",
            EC_POINT_SIZE,
            point.len()
        )));
    }
    if point[0] != 0x04 {
        return Err(Error::InvalidPublicKey(
            "P-256 public key must use uncompressed form (0x04 prefix)".into(),
        ));
    }

    PublicKey::from_sec1_bytes(point)
        .map_err(|_| Error::InvalidPublicKey("invalid P-256 public key point".into()))
}
