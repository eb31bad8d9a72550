//! Session context and public API.
//!
//! A [`SecureSession`] owns the local identity, a fresh ephemeral ECDH
//! keypair, the remote peer record, the handshake state and, once
//! established, the derived session id, master key and per-direction message
//! keys. It is a single-threaded mutable state machine; drive one session
//! from one thread.

use crate::peer::{LocalIdentity, PeerRecord};
use crate::record::{wrapped_size, MessageKeys, MAX_RECORD_SIZE};
use crate::transport::SessionTransport;
use crate::{Error, Result};
use tsp_crypto::ecdh::EcdhKeyPair;
use tsp_crypto::sign;
use zeroize::{Zeroize, Zeroizing};

/// Handshake buffer: large enough for any key agreement message carrying an
/// identity of at least 1 KB.
pub(crate) const HANDSHAKE_BUFFER_SIZE: usize = 2048;

/// Session states. The first four drive the four handshake messages; a
/// session in `Established` moves application data only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Server default: waiting for the client's opening message.
    AcceptWait,
    /// Client: opening message sent, waiting for the server's reply.
    ProceedClientWait,
    /// Server: reply sent, waiting for the client's confirmation.
    FinishServerWait,
    /// Client: confirmation sent, waiting for the server's final MAC.
    FinishClientWait,
    /// Key agreement complete; application data may flow.
    Established,
}

/// A secure session between two named peers.
pub struct SecureSession<T: SessionTransport> {
    pub(crate) we: LocalIdentity,
    pub(crate) peer: PeerRecord,
    /// Ephemeral keypair; dropped (and zeroized) once established.
    pub(crate) ecdh: Option<EcdhKeyPair>,
    pub(crate) state: SessionState,
    /// Set by `connect`; selects the direction keys at establishment.
    pub(crate) is_client: bool,
    pub(crate) session_id: Option<[u8; 32]>,
    pub(crate) master_key: Option<Zeroizing<[u8; 32]>>,
    pub(crate) keys: Option<MessageKeys>,
    pub(crate) transport: T,
}

impl<T: SessionTransport> SecureSession<T> {
    /// Create a session with the given identity and private signing key
    /// (a `REC2` container). The session starts in [`SessionState::AcceptWait`]
    /// with a fresh ephemeral ECDH keypair.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for an empty identity or an unusable
    /// signing key; crypto errors from keypair generation pass through.
    pub fn new(id: &[u8], sign_key: &[u8], transport: T) -> Result<Self> {
        if id.is_empty() {
            return Err(Error::InvalidParameter);
        }
        sign::validate_signing_key(sign_key).map_err(|_| Error::InvalidParameter)?;

        let ecdh = EcdhKeyPair::generate()?;

        Ok(Self {
            we: LocalIdentity::new(id, sign_key),
            peer: PeerRecord::default(),
            ecdh: Some(ecdh),
            state: SessionState::AcceptWait,
            is_client: false,
            session_id: None,
            master_key: None,
            keys: None,
            transport,
        })
    }

    /// Initiate the handshake as the client: send the opening message and
    /// move to [`SessionState::ProceedClientWait`].
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if the session already left its initial state.
    pub fn connect(&mut self) -> Result<()> {
        if self.state != SessionState::AcceptWait {
            return Err(Error::InvalidParameter);
        }
        self.initiate()
    }

    /// Send one application message. Established sessions only; empty
    /// messages are rejected.
    ///
    /// Returns the plaintext length on success.
    pub fn send(&mut self, message: &[u8]) -> Result<usize> {
        let frame = self.wrap(message)?;
        self.transport.send_data(&frame)?;
        Ok(message.len())
    }

    /// Receive one message from the transport.
    ///
    /// Before establishment this pulls one handshake frame, feeds it to the
    /// current state handler and returns `Ok(0)` when the step is consumed.
    /// After establishment it pulls one wrapped record, decrypts it into
    /// `dst` and returns the plaintext length. The two cases are
    /// distinguishable because empty application messages cannot be sent.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` on any protocol, authentication or state
    /// violation; `BufferTooSmall` if `dst` cannot hold the plaintext (the
    /// record is already consumed from the transport at that point, so size
    /// `dst` to the expected message or use [`SecureSession::unwrap`] when
    /// retries matter); `Io` on transport failure.
    pub fn receive(&mut self, dst: &mut [u8]) -> Result<usize> {
        if self.state != SessionState::Established {
            let mut buf = [0u8; HANDSHAKE_BUFFER_SIZE];
            let received = self.transport.receive_data(&mut buf)?;
            if received > buf.len() {
                return Err(Error::Io("transport overran the receive buffer".into()));
            }
            self.handle_handshake(&buf[..received])?;
            return Ok(0);
        }

        if dst.is_empty() {
            return Err(Error::InvalidParameter);
        }

        // The incoming frame size does not depend on `dst`, so the read
        // buffer is sized to the record floor: an oversized plaintext still
        // authenticates and reports `BufferTooSmall` instead of failing the
        // transport read.
        let need = wrapped_size(dst.len()).max(MAX_RECORD_SIZE);
        let mut buf = vec![0u8; need];
        let received = self.transport.receive_data(&mut buf)?;
        if received > need {
            return Err(Error::Io("transport overran the receive buffer".into()));
        }
        self.unwrap(&buf[..received], dst)
    }

    /// Encrypt one application message into a wire frame without sending it.
    /// Established sessions only; empty messages are rejected.
    pub fn wrap(&mut self, message: &[u8]) -> Result<Vec<u8>> {
        if message.is_empty() || self.state != SessionState::Established {
            return Err(Error::InvalidParameter);
        }
        let session_id = self.session_id.as_ref().ok_or(Error::InvalidParameter)?;
        let keys = self.keys.as_mut().ok_or(Error::InvalidParameter)?;
        keys.wrap(session_id, message)
    }

    /// Authenticate and decrypt one wire frame into `dst` without touching
    /// the transport. Established sessions only.
    ///
    /// Returns the plaintext length.
    pub fn unwrap(&mut self, frame: &[u8], dst: &mut [u8]) -> Result<usize> {
        if self.state != SessionState::Established {
            return Err(Error::InvalidParameter);
        }
        let session_id = self.session_id.as_ref().ok_or(Error::InvalidParameter)?;
        let keys = self.keys.as_mut().ok_or(Error::InvalidParameter)?;
        keys.unwrap_into(session_id, frame, dst)
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True once the handshake completed.
    pub fn is_established(&self) -> bool {
        self.state == SessionState::Established
    }

    /// The derived session id, available once the key schedule ran.
    pub fn session_id(&self) -> Option<&[u8; 32]> {
        self.session_id.as_ref()
    }

    /// The remote peer's identity, available once validated.
    pub fn remote_id(&self) -> Option<&[u8]> {
        if self.peer.is_populated() {
            Some(&self.peer.id)
        } else {
            None
        }
    }

    /// Shared access to the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T: SessionTransport> Drop for SecureSession<T> {
    fn drop(&mut self) {
        // Master key, message keys and the ephemeral keypair zeroize through
        // their own drops; the session id is wiped here.
        if let Some(session_id) = self.session_id.as_mut() {
            session_id.zeroize();
        }
    }
}
