//! Key derivation (HKDF-SHA256).
//!
//! The session key schedule derives everything from labelled invocations of
//! one KDF: a label string plus an ordered list of context fragments. The
//! fragments are appended to the label in order to form the HKDF info input;
//! both peers must assemble the same fragment sequence to arrive at the same
//! output, which is what binds the derived keys to the handshake transcript.

use crate::{Error, Result};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Length of every derived key and identifier.
pub const DERIVED_KEY_SIZE: usize = 32;

/// Generic HKDF-SHA256 derivation per RFC 5869.
///
/// # Arguments
/// * `ikm` - Input key material (may be empty for non-secret derivations)
/// * `salt` - Salt value (empty slice for no salt)
/// * `info` - Context and application-specific information
/// * `output_len` - Length of output key material
///
/// # Errors
///
/// Returns `Error::KeyDerivation` if `output_len` exceeds the HKDF expansion
/// limit.
pub fn hkdf_sha256(
    ikm: &[u8],
    salt: &[u8],
    info: &[u8],
    output_len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);

    let mut okm = vec![0u8; output_len];
    hk.expand(info, &mut okm)
        .map_err(|_| Error::KeyDerivation("HKDF expansion failed".into()))?;

    Ok(Zeroizing::new(okm))
}

/// Labelled derivation over ordered context fragments.
///
/// Computes HKDF-SHA256 with IKM = `key`, no salt, and
/// info = `label` ‖ `context[0]` ‖ `context[1]` ‖ … . Output is always
/// [`DERIVED_KEY_SIZE`] bytes.
///
/// # Errors
///
/// Propagates HKDF failures as `Error::KeyDerivation`.
pub fn kdf(
    key: &[u8],
    label: &str,
    context: &[&[u8]],
) -> Result<Zeroizing<[u8; DERIVED_KEY_SIZE]>> {
    let mut info = Vec::with_capacity(
        label.len() + context.iter().map(|fragment| fragment.len()).sum::<usize>(),
    );
    info.extend_from_slice(label.as_bytes());
    for fragment in context {
        info.extend_from_slice(fragment);
    }

    let okm = hkdf_sha256(key, &[], &info, DERIVED_KEY_SIZE)?;

    let mut result = [0u8; DERIVED_KEY_SIZE];
    result.copy_from_slice(&okm);
    Ok(Zeroizing::new(result))
}
