#![allow(dead_code)]

//! In-memory transport harness shared by the integration suites.
//!
//! Two sessions share a pair of frame queues; each side's transport pushes
//! onto one queue and pops from the other, and resolves peer identities from
//! a small in-memory key directory.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use tsp_core::{Error, Result, SecureSession, SessionState, SessionTransport};
use tsp_crypto::sign::generate_signing_keypair;

/// The two directional frame queues between a client and a server.
#[derive(Default)]
pub struct Wire {
    pub to_server: VecDeque<Vec<u8>>,
    pub to_client: VecDeque<Vec<u8>>,
}

pub type SharedWire = Rc<RefCell<Wire>>;

/// Queue-backed transport for one endpoint.
pub struct TestTransport {
    wire: SharedWire,
    is_client: bool,
    /// Identity -> signing public key container.
    pub directory: HashMap<Vec<u8>, Vec<u8>>,
    /// Number of `Established` notifications observed.
    pub established_events: usize,
}

impl SessionTransport for TestTransport {
    fn send_data(&mut self, data: &[u8]) -> Result<usize> {
        let mut wire = self.wire.borrow_mut();
        let queue = if self.is_client {
            &mut wire.to_server
        } else {
            &mut wire.to_client
        };
        queue.push_back(data.to_vec());
        Ok(data.len())
    }

    fn receive_data(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut wire = self.wire.borrow_mut();
        let queue = if self.is_client {
            &mut wire.to_client
        } else {
            &mut wire.to_server
        };
        let frame = queue
            .pop_front()
            .ok_or_else(|| Error::Io("no frame queued".into()))?;
        if frame.len() > buffer.len() {
            return Err(Error::Io("frame larger than receive buffer".into()));
        }
        buffer[..frame.len()].copy_from_slice(&frame);
        Ok(frame.len())
    }

    fn get_public_key_for_id(&mut self, id: &[u8]) -> Option<Vec<u8>> {
        self.directory.get(id).cloned()
    }

    fn on_state_changed(&mut self, state: SessionState) {
        if state == SessionState::Established {
            self.established_events += 1;
        }
    }
}

pub type TestSession = SecureSession<TestTransport>;

/// Build a connected client/server session pair with the given identities,
/// both signing keys registered in both directories.
pub fn session_pair_with_ids(
    client_id: &[u8],
    server_id: &[u8],
) -> (TestSession, TestSession, SharedWire) {
    let (client_sign, client_public) = generate_signing_keypair().unwrap();
    let (server_sign, server_public) = generate_signing_keypair().unwrap();

    let mut directory = HashMap::new();
    directory.insert(client_id.to_vec(), client_public);
    directory.insert(server_id.to_vec(), server_public);

    let wire: SharedWire = Rc::new(RefCell::new(Wire::default()));

    let client_transport = TestTransport {
        wire: Rc::clone(&wire),
        is_client: true,
        directory: directory.clone(),
        established_events: 0,
    };
    let server_transport = TestTransport {
        wire: Rc::clone(&wire),
        is_client: false,
        directory,
        established_events: 0,
    };

    let client = SecureSession::new(client_id, &client_sign, client_transport).unwrap();
    let server = SecureSession::new(server_id, &server_sign, server_transport).unwrap();
    (client, server, wire)
}

pub fn session_pair() -> (TestSession, TestSession, SharedWire) {
    session_pair_with_ids(b"client", b"server")
}

/// A transport wired to nothing, for constructor-level tests.
pub fn lone_transport() -> TestTransport {
    TestTransport {
        wire: Rc::new(RefCell::new(Wire::default())),
        is_client: true,
        directory: HashMap::new(),
        established_events: 0,
    }
}

/// Pump one queued frame through a session's dispatcher.
pub fn step(session: &mut TestSession) -> Result<usize> {
    let mut empty = [0u8; 0];
    session.receive(&mut empty)
}

/// Run the full four-message handshake.
pub fn drive_handshake(client: &mut TestSession, server: &mut TestSession) -> Result<()> {
    client.connect()?;
    step(server)?;
    step(client)?;
    step(server)?;
    step(client)?;
    Ok(())
}
