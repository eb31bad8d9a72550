//! ECDSA P-256 signatures over ordered context fragments.
//!
//! Handshake signatures cover a sequence of logically distinct fields (key
//! containers, identities). Callers pass those fields as an ordered fragment
//! list; the fragments are fed into the message digest in order and are never
//! spliced into a single buffer by the caller. Signatures use the fixed
//! 64-byte (r ‖ s) encoding.
//!
//! Keys live in containers: private scalars in `REC2`, public SEC1 points in
//! `UEC2`, so both sides of the protocol can move them around as opaque
//! checksummed blobs.

use crate::container::{self, ContainerRef, EC_PRIV_KEY_TAG, EC_PUB_KEY_TAG};
use crate::ecdh::parse_public_key;
use crate::{Error, Result};
use p256::ecdsa::signature::{DigestSigner, DigestVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Length of a signature in the fixed (r ‖ s) encoding.
pub const SIGNATURE_SIZE: usize = 64;

/// Generate a long-term signing keypair.
///
/// Returns `(private_container, public_container)`: a `REC2` container
/// holding the 32-byte scalar and a `UEC2` container holding the
/// uncompressed SEC1 point. The private container is zeroed on drop.
pub fn generate_signing_keypair() -> Result<(Zeroizing<Vec<u8>>, Vec<u8>)> {
    let signing_key = SigningKey::random(&mut rand::rngs::OsRng);
    let scalar: Zeroizing<[u8; 32]> = Zeroizing::new(signing_key.to_bytes().into());
    let private_container = Zeroizing::new(container::seal(EC_PRIV_KEY_TAG, scalar.as_slice()));

    let point = signing_key.verifying_key().to_encoded_point(false);
    let public_container = container::seal(EC_PUB_KEY_TAG, point.as_bytes());

    Ok((private_container, public_container))
}

/// Sign the ordered `fragments` with the private key in a `REC2` container.
///
/// # Errors
///
/// Returns an error if the key container is malformed or does not hold a
/// valid P-256 scalar.
pub fn compute_signature(
    private_container: &[u8],
    fragments: &[&[u8]],
) -> Result<[u8; SIGNATURE_SIZE]> {
    let signing_key = signing_key_from_container(private_container)?;

    let mut digest = Sha256::new();
    for fragment in fragments {
        digest.update(fragment);
    }

    let signature: Signature = signing_key
        .try_sign_digest(digest)
        .map_err(|_| Error::Signature("signing failed".into()))?;

    let mut out = [0u8; SIGNATURE_SIZE];
    out.copy_from_slice(&signature.to_bytes());
    Ok(out)
}

/// Verify `signature` over the ordered `fragments` with the public key in a
/// `UEC2` container.
///
/// # Errors
///
/// Returns `Error::Signature` if the signature is malformed or does not
/// verify, or a key error if the container does not hold a valid public key.
pub fn verify_signature(
    public_container: &[u8],
    fragments: &[&[u8]],
    signature: &[u8],
) -> Result<()> {
    let verifying_key = VerifyingKey::from(parse_public_key(public_container)?);

    let signature = Signature::from_slice(signature)
        .map_err(|_| Error::Signature("malformed signature".into()))?;

    let mut digest = Sha256::new();
    for fragment in fragments {
        digest.update(fragment);
    }

    verifying_key
        .verify_digest(digest, &signature)
        .map_err(|_| Error::Signature("signature mismatch".into()))
}

/// Check that `private_container` holds a usable signing key.
///
/// # Errors
///
/// Returns the same errors as [`compute_signature`] for a bad container or
/// scalar.
pub fn validate_signing_key(private_container: &[u8]) -> Result<()> {
    signing_key_from_container(private_container).map(|_| ())
}

fn signing_key_from_container(private_container: &[u8]) -> Result<SigningKey> {
    let parsed = ContainerRef::parse_expecting(EC_PRIV_KEY_TAG, private_container)?;
    let scalar = parsed.payload();
    if scalar.len() != 32 {
        return Err(Error::InvalidKeyLength(format!(
            "P-256 private key must be 32 bytes, got {}",
            scalar.len()
        )));
    }
    SigningKey::from_slice(scalar)
        .map_err(|_| Error::InvalidPrivateKey("invalid P-256 signing key".into()))
}
