//! Record layer: authenticated wrapping of application messages.
//!
//! Once a session is established, each direction owns a message key derived
//! from the session master key, plus a sequence counter. A wrapped message is
//! an outer protocol container whose payload is:
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │ seq        : u64 big-endian        [8 bytes]  │
//! │ ciphertext : AES-256-GCM output    [n bytes]  │
//! │ tag        : GCM tag               [16 bytes] │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! The sequence number feeds the AEAD nonce and, together with the session
//! id, the additional authenticated data, binding every record to its session
//! and position. The transport is in-order and reliable, so the receiver
//! requires each record to carry exactly the expected sequence number.

use crate::handshake::PROTO_TAG;
use crate::{Error, Result};
use tsp_crypto::aead::{aes256gcm_decrypt, aes256gcm_encrypt, construct_nonce, AEAD_TAG_SIZE};
use tsp_crypto::container::{self, ContainerRef, HEADER_SIZE};
use tsp_crypto::kdf::kdf;
use zeroize::Zeroizing;

const MESSAGE_KEY_LABEL: &str = "Themis secure session message key";

const SEQ_SIZE: usize = 8;
const SESSION_ID_SIZE: usize = 32;

/// On-wire size of a wrapped message carrying `message_len` plaintext bytes.
pub fn wrapped_size(message_len: usize) -> usize {
    HEADER_SIZE + SEQ_SIZE + message_len + AEAD_TAG_SIZE
}

/// Floor on the transport read buffer used when receiving records.
///
/// The size of an incoming frame does not depend on the caller's destination
/// buffer, so `receive` always offers the transport at least this much room.
/// A record whose plaintext exceeds the destination then still authenticates
/// and is reported as `BufferTooSmall` with the required length.
pub const MAX_RECORD_SIZE: usize = 65_536;

/// Per-direction message keys and sequence counters.
pub(crate) struct MessageKeys {
    send_key: Zeroizing<[u8; 32]>,
    recv_key: Zeroizing<[u8; 32]>,
    send_seq: u64,
    recv_seq: u64,
}

impl MessageKeys {
    /// Derive both direction keys from the master key.
    ///
    /// The client sends on the client-to-server key and receives on the
    /// server-to-client key; the server the reverse.
    pub fn derive(master_key: &[u8], is_client: bool) -> Result<Self> {
        let client_to_server = kdf(master_key, MESSAGE_KEY_LABEL, &[b"client"])?;
        let server_to_client = kdf(master_key, MESSAGE_KEY_LABEL, &[b"server"])?;

        let (send_key, recv_key) = if is_client {
            (client_to_server, server_to_client)
        } else {
            (server_to_client, client_to_server)
        };

        Ok(Self {
            send_key,
            recv_key,
            send_seq: 0,
            recv_seq: 0,
        })
    }

    /// Encrypt `message` into a wire frame and advance the send counter.
    pub fn wrap(&mut self, session_id: &[u8; SESSION_ID_SIZE], message: &[u8]) -> Result<Vec<u8>> {
        let seq = self.send_seq;
        let aad = record_aad(session_id, seq);

        let ciphertext =
            aes256gcm_encrypt(&self.send_key, &construct_nonce(seq), message, &aad)?;

        let mut payload = Vec::with_capacity(SEQ_SIZE + ciphertext.len());
        payload.extend_from_slice(&seq.to_be_bytes());
        payload.extend_from_slice(&ciphertext);

        self.send_seq += 1;
        Ok(container::seal(PROTO_TAG, &payload))
    }

    /// Authenticate and decrypt one wire frame into `dst`.
    ///
    /// Returns the plaintext length. The receive counter advances only on
    /// success, so a failed call (including `BufferTooSmall`) can be retried
    /// with the same frame.
    pub fn unwrap_into(
        &mut self,
        session_id: &[u8; SESSION_ID_SIZE],
        frame: &[u8],
        dst: &mut [u8],
    ) -> Result<usize> {
        let outer = ContainerRef::parse_expecting(PROTO_TAG, frame)
            .map_err(|_| Error::InvalidParameter)?;
        let payload = outer.payload();
        if payload.len() < SEQ_SIZE + AEAD_TAG_SIZE {
            return Err(Error::InvalidParameter);
        }

        let mut seq_bytes = [0u8; SEQ_SIZE];
        seq_bytes.copy_from_slice(&payload[..SEQ_SIZE]);
        let seq = u64::from_be_bytes(seq_bytes);
        if seq != self.recv_seq {
            return Err(Error::InvalidParameter);
        }

        let aad = record_aad(session_id, seq);
        let plaintext = aes256gcm_decrypt(
            &self.recv_key,
            &construct_nonce(seq),
            &payload[SEQ_SIZE..],
            &aad,
        )
        .map_err(|_| Error::InvalidParameter)?;

        if plaintext.len() > dst.len() {
            return Err(Error::BufferTooSmall {
                needed: plaintext.len(),
            });
        }

        dst[..plaintext.len()].copy_from_slice(&plaintext);
        self.recv_seq += 1;
        Ok(plaintext.len())
    }
}

fn record_aad(session_id: &[u8; SESSION_ID_SIZE], seq: u64) -> [u8; SESSION_ID_SIZE + SEQ_SIZE] {
    let mut aad = [0u8; SESSION_ID_SIZE + SEQ_SIZE];
    aad[..SESSION_ID_SIZE].copy_from_slice(session_id);
    aad[SESSION_ID_SIZE..].copy_from_slice(&seq.to_be_bytes());
    aad
}
