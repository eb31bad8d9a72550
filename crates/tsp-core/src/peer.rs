//! Peer records: identity and key material snapshots for both endpoints.
//!
//! The remote record is populated only after the first handshake message
//! from that peer has been cryptographically validated, and is wiped on any
//! handshake failure and on drop.

use zeroize::{Zeroize, Zeroizing};

/// The local endpoint: identity plus the private signing key container.
pub(crate) struct LocalIdentity {
    /// Identity bytes, chosen by the application.
    pub id: Vec<u8>,
    /// Private signing key as a `REC2` container.
    pub sign_key: Zeroizing<Vec<u8>>,
}

impl LocalIdentity {
    pub fn new(id: &[u8], sign_key: &[u8]) -> Self {
        Self {
            id: id.to_vec(),
            sign_key: Zeroizing::new(sign_key.to_vec()),
        }
    }
}

impl Drop for LocalIdentity {
    fn drop(&mut self) {
        self.id.zeroize();
    }
}

/// Snapshot of the remote peer captured during the handshake.
///
/// `ecdh_key` and `sign_key` hold full container bytes (`UEC2`), so they can
/// be dropped straight into signature transcripts and key agreement calls.
#[derive(Default)]
pub(crate) struct PeerRecord {
    pub id: Vec<u8>,
    pub ecdh_key: Vec<u8>,
    pub sign_key: Vec<u8>,
}

impl PeerRecord {
    /// Populate the record after the peer's message validated.
    pub fn set(&mut self, id: &[u8], ecdh_key: &[u8], sign_key: &[u8]) {
        self.wipe();
        self.id = id.to_vec();
        self.ecdh_key = ecdh_key.to_vec();
        self.sign_key = sign_key.to_vec();
    }

    /// Zero and clear all captured material.
    pub fn wipe(&mut self) {
        self.id.zeroize();
        self.ecdh_key.zeroize();
        self.sign_key.zeroize();
    }

    pub fn is_populated(&self) -> bool {
        !self.id.is_empty()
    }
}

impl Drop for PeerRecord {
    fn drop(&mut self) {
        self.wipe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_record_starts_empty() {
        let record = PeerRecord::default();
        assert!(!record.is_populated());
    }

    #[test]
    fn test_set_and_wipe() {
        let mut record = PeerRecord::default();
        record.set(b"peer", b"ecdh container", b"sign container");
        assert!(record.is_populated());
        assert_eq!(record.id, b"peer");

        record.wipe();
        assert!(!record.is_populated());
        assert!(record.ecdh_key.is_empty());
        assert!(record.sign_key.is_empty());
    }

    #[test]
    fn test_set_replaces_previous_peer() {
        let mut record = PeerRecord::default();
        record.set(b"first", b"e1", b"s1");
        record.set(b"second", b"e2", b"s2");
        assert_eq!(record.id, b"second");
        assert_eq!(record.ecdh_key, b"e2");
    }
}
