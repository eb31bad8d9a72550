//! Message authentication (HMAC-SHA256) over ordered context fragments.
//!
//! Like signatures, MACs cover a sequence of logically distinct fields fed to
//! the HMAC in order. Verification is constant-time.

use crate::{Error, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Length of a MAC tag.
pub const MAC_SIZE: usize = 32;

/// Compute the HMAC-SHA256 tag over the ordered `fragments`.
///
/// # Errors
///
/// Returns `Error::Mac` if the key is rejected by the HMAC construction.
pub fn compute_mac(key: &[u8], fragments: &[&[u8]]) -> Result<[u8; MAC_SIZE]> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| Error::Mac)?;
    for fragment in fragments {
        mac.update(fragment);
    }

    let mut out = [0u8; MAC_SIZE];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// Verify `tag` against the HMAC-SHA256 of the ordered `fragments`.
///
/// Comparison is constant-time.
///
/// # Errors
///
/// Returns `Error::Mac` on any mismatch, including a wrong-length tag.
pub fn verify_mac(key: &[u8], fragments: &[&[u8]], tag: &[u8]) -> Result<()> {
    let computed = compute_mac(key, fragments)?;
    if bool::from(tag.ct_eq(&computed)) {
        Ok(())
    } else {
        Err(Error::Mac)
    }
}
