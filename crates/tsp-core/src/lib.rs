//! Secure session core: mutually-authenticated key agreement between two
//! named peers followed by an authenticated message channel.
//!
//! A session is driven through four handshake messages. The client calls
//! [`SecureSession::connect`]; from then on each side pumps
//! [`SecureSession::receive`], which routes incoming frames to the handshake
//! state machine until the session is established and to the record layer
//! afterwards. All I/O and identity lookup goes through the caller-provided
//! [`SessionTransport`].
//!
//! The core is synchronous and single-threaded per session: no locking, no
//! async, no timeouts. Distinct sessions are independent. No session state is
//! ever persisted, and all secret material is wiped on teardown.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
mod handshake;
mod peer;
mod record;
pub mod session;
pub mod transport;

pub use error::{Error, Result};
pub use record::{wrapped_size, MAX_RECORD_SIZE};
pub use session::{SecureSession, SessionState};
pub use transport::SessionTransport;
