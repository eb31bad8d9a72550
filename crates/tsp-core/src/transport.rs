//! The transport trait: I/O, identity lookup and state notification.
//!
//! The session owns an implementation of [`SessionTransport`] and calls into
//! it for every byte moved and every public key resolved. Implementations
//! hold whatever state they need (sockets, queues, key directories); the core
//! never frees or shares them.

use crate::session::SessionState;
use crate::Result;

/// Caller-provided transport and identity services.
///
/// Calls block; scheduling and timeouts are the implementation's concern.
pub trait SessionTransport {
    /// Send one framed message. Returns the number of bytes accepted.
    ///
    /// # Errors
    ///
    /// Implementations report failures as [`crate::Error::Io`].
    fn send_data(&mut self, data: &[u8]) -> Result<usize>;

    /// Receive exactly one framed message into `buffer`.
    ///
    /// Returns the number of bytes read. Partial frames are the
    /// implementation's problem to reassemble; the core expects one complete
    /// container per call.
    ///
    /// # Errors
    ///
    /// Implementations report failures as [`crate::Error::Io`].
    fn receive_data(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Look up the long-term signing public key for a peer identity.
    ///
    /// Returns the key as a `UEC2` container, or `None` if the identity is
    /// unknown (which rejects the handshake).
    fn get_public_key_for_id(&mut self, id: &[u8]) -> Option<Vec<u8>>;

    /// Notification of a session state change. Default: ignore.
    fn on_state_changed(&mut self, state: SessionState) {
        let _ = state;
    }
}
