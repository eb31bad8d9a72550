//! The four-message handshake state machine.
//!
//! Message flow (client left, server right):
//!
//! ```text
//! connect()  ──  id ‖ ecdh_pub ‖ sig(ecdh_pub) ──────────────▶  AcceptWait
//!
//! ProceedClientWait  ◀── id ‖ ecdh_pub ‖ sig(4-tuple) ────────  (reply)
//!
//! (confirm)  ──  sig(4-tuple) ‖ mac(server_ecdh ‖ sid) ──────▶  FinishServerWait
//!
//! FinishClientWait  ◀── mac(client_ecdh ‖ sid) ───────────────  (final)
//! ```
//!
//! The signature and KDF transcripts are ordered fragment lists. The session
//! id context is always assembled client-first:
//! `client_ecdh ‖ server_ecdh ‖ client_id ‖ server_id`. The client supplies
//! (own, peer, own, peer) and the server (peer, own, peer, own), which is the
//! same byte sequence. Getting this ordering wrong desynchronizes the key
//! schedule without any parse error, so the fragment arrays below stay
//! explicit at each call site.
//!
//! Any failure in a handler wipes the peer record and all derived secrets,
//! leaving the session unable to make further progress. The state tag itself
//! is not advanced on failure.

use crate::session::{SecureSession, SessionState};
use crate::transport::SessionTransport;
use crate::{Error, Result};
use tsp_crypto::container::{self, ContainerRef, EC_PUB_KEY_PREFIX, HEADER_SIZE};
use tsp_crypto::kdf::kdf;
use tsp_crypto::mac::{compute_mac, verify_mac, MAC_SIZE};
use tsp_crypto::sign::{compute_signature, verify_signature, SIGNATURE_SIZE};

/// Outer tag of every handshake and record frame.
pub(crate) const PROTO_TAG: [u8; 4] = *b"TSPM";

/// Tag of the inner identity container in key agreement messages.
pub(crate) const ID_TAG: [u8; 4] = *b"TSID";

const SESSION_ID_LABEL: &str = "Themis secure session unique identifier";
const MASTER_KEY_LABEL: &str = "Themis secure session master key";

/// Fields of a key agreement message (the first two handshake messages):
/// identity container payload, ECDH public key container, trailing signature.
struct KeyAgreementFields<'a> {
    peer_id: &'a [u8],
    peer_ecdh: &'a [u8],
    signature: &'a [u8],
}

fn parse_key_agreement(payload: &[u8]) -> Result<KeyAgreementFields<'_>> {
    let id_container =
        ContainerRef::parse_expecting(ID_TAG, payload).map_err(|_| Error::InvalidParameter)?;
    let rest = &payload[id_container.total_len()..];

    let ecdh_container = ContainerRef::parse(rest).map_err(|_| Error::InvalidParameter)?;
    if !ecdh_container.has_tag_prefix(EC_PUB_KEY_PREFIX) {
        return Err(Error::InvalidParameter);
    }

    let (peer_ecdh, signature) = rest.split_at(ecdh_container.total_len());
    if signature.len() != SIGNATURE_SIZE {
        return Err(Error::InvalidParameter);
    }

    Ok(KeyAgreementFields {
        peer_id: id_container.payload(),
        peer_ecdh,
        signature,
    })
}

/// Compose a key agreement frame: `Container(TSPM, Container(TSID, id) ‖
/// ecdh_pub_container ‖ signature)`. The outer container is sealed last,
/// after every inner section is in place.
fn build_key_agreement_frame(id: &[u8], ecdh_container: &[u8], signature: &[u8]) -> Vec<u8> {
    let id_container = container::seal(ID_TAG, id);

    let mut payload =
        Vec::with_capacity(id_container.len() + ecdh_container.len() + signature.len());
    payload.extend_from_slice(&id_container);
    payload.extend_from_slice(ecdh_container);
    payload.extend_from_slice(signature);

    container::seal(PROTO_TAG, &payload)
}

impl<T: SessionTransport> SecureSession<T> {
    /// Build and send the client's opening message.
    pub(crate) fn initiate(&mut self) -> Result<()> {
        let own_ecdh = self.own_ecdh()?.to_vec();
        let signature = compute_signature(&self.we.sign_key, &[own_ecdh.as_slice()])?;

        let frame = build_key_agreement_frame(&self.we.id, &own_ecdh, &signature);
        self.transport.send_data(&frame)?;

        self.state = SessionState::ProceedClientWait;
        self.is_client = true;
        Ok(())
    }

    /// Route one incoming handshake frame to the current state handler,
    /// wiping the peer record and derived secrets on any failure.
    pub(crate) fn handle_handshake(&mut self, data: &[u8]) -> Result<()> {
        let result = match self.state {
            SessionState::AcceptWait => self.on_accept_wait(data),
            SessionState::ProceedClientWait => self.on_proceed_client_wait(data),
            SessionState::FinishServerWait => self.on_finish_server_wait(data),
            SessionState::FinishClientWait => self.on_finish_client_wait(data),
            SessionState::Established => Err(Error::InvalidParameter),
        };

        if result.is_err() {
            self.abort_handshake();
        }
        result
    }

    /// Server: process the client's opening message, reply with our own key
    /// agreement message.
    fn on_accept_wait(&mut self, data: &[u8]) -> Result<()> {
        let outer =
            ContainerRef::parse_expecting(PROTO_TAG, data).map_err(|_| Error::InvalidParameter)?;
        let fields = parse_key_agreement(outer.payload())?;

        let peer_sign_key = self.lookup_peer_key(fields.peer_id)?;

        // The client signs only its ECDH key: it does not yet know who it is
        // talking to, so there is nothing else to bind.
        verify_signature(&peer_sign_key, &[fields.peer_ecdh], fields.signature)
            .map_err(|_| Error::InvalidParameter)?;

        self.peer.set(fields.peer_id, fields.peer_ecdh, &peer_sign_key);

        // Reply, binding both keys and both identities, own-first.
        let own_ecdh = self.own_ecdh()?.to_vec();
        let signature = compute_signature(
            &self.we.sign_key,
            &[
                own_ecdh.as_slice(),
                self.peer.ecdh_key.as_slice(),
                self.we.id.as_slice(),
                self.peer.id.as_slice(),
            ],
        )?;

        let frame = build_key_agreement_frame(&self.we.id, &own_ecdh, &signature);
        self.transport.send_data(&frame)?;

        self.state = SessionState::FinishServerWait;
        Ok(())
    }

    /// Client: process the server's reply, run the key schedule, send the
    /// confirmation message.
    fn on_proceed_client_wait(&mut self, data: &[u8]) -> Result<()> {
        let outer =
            ContainerRef::parse_expecting(PROTO_TAG, data).map_err(|_| Error::InvalidParameter)?;
        let fields = parse_key_agreement(outer.payload())?;

        let peer_sign_key = self.lookup_peer_key(fields.peer_id)?;
        let own_ecdh = self.own_ecdh()?.to_vec();

        // The server signed (server_ecdh, client_ecdh, server_id, client_id);
        // from here that is (peer, own, peer, own).
        verify_signature(
            &peer_sign_key,
            &[
                fields.peer_ecdh,
                own_ecdh.as_slice(),
                fields.peer_id,
                self.we.id.as_slice(),
            ],
            fields.signature,
        )
        .map_err(|_| Error::InvalidParameter)?;

        self.peer.set(fields.peer_id, fields.peer_ecdh, &peer_sign_key);

        // Session id context, client-first: we are the client, so own-first.
        let session_id = kdf(
            &[],
            SESSION_ID_LABEL,
            &[
                own_ecdh.as_slice(),
                self.peer.ecdh_key.as_slice(),
                self.we.id.as_slice(),
                self.peer.id.as_slice(),
            ],
        )?;

        let ecdh = self.ecdh.as_ref().ok_or(Error::InvalidParameter)?;
        let shared_secret = ecdh
            .exchange(&self.peer.ecdh_key)
            .map_err(|_| Error::InvalidParameter)?;

        let master_key = kdf(&*shared_secret, MASTER_KEY_LABEL, &[session_id.as_slice()])?;

        // Confirmation: signature over the full 4-tuple, client-first, and a
        // MAC over the server's ECDH key and the session id.
        let signature = compute_signature(
            &self.we.sign_key,
            &[
                own_ecdh.as_slice(),
                self.peer.ecdh_key.as_slice(),
                self.we.id.as_slice(),
                self.peer.id.as_slice(),
            ],
        )?;
        let mac = compute_mac(
            &*master_key,
            &[self.peer.ecdh_key.as_slice(), session_id.as_slice()],
        )?;

        let mut payload = Vec::with_capacity(SIGNATURE_SIZE + MAC_SIZE);
        payload.extend_from_slice(&signature);
        payload.extend_from_slice(&mac);
        let frame = container::seal(PROTO_TAG, &payload);

        self.session_id = Some(*session_id);
        self.master_key = Some(master_key);

        self.transport.send_data(&frame)?;

        self.state = SessionState::FinishClientWait;
        Ok(())
    }

    /// Server: verify the client's confirmation, run the key schedule, send
    /// the final MAC and establish.
    fn on_finish_server_wait(&mut self, data: &[u8]) -> Result<()> {
        let outer =
            ContainerRef::parse_expecting(PROTO_TAG, data).map_err(|_| Error::InvalidParameter)?;
        let payload = outer.payload();
        if payload.len() != SIGNATURE_SIZE + MAC_SIZE {
            return Err(Error::InvalidParameter);
        }
        let (signature, mac) = payload.split_at(SIGNATURE_SIZE);

        if !self.peer.is_populated() {
            return Err(Error::InvalidParameter);
        }
        let own_ecdh = self.own_ecdh()?.to_vec();

        // The client signed (client_ecdh, server_ecdh, client_id, server_id);
        // from here that is (peer, own, peer, own).
        verify_signature(
            &self.peer.sign_key,
            &[
                self.peer.ecdh_key.as_slice(),
                own_ecdh.as_slice(),
                self.peer.id.as_slice(),
                self.we.id.as_slice(),
            ],
            signature,
        )
        .map_err(|_| Error::InvalidParameter)?;

        let ecdh = self.ecdh.as_ref().ok_or(Error::InvalidParameter)?;
        let shared_secret = ecdh
            .exchange(&self.peer.ecdh_key)
            .map_err(|_| Error::InvalidParameter)?;

        // Session id context, client-first: we are the server, so peer-first.
        let session_id = kdf(
            &[],
            SESSION_ID_LABEL,
            &[
                self.peer.ecdh_key.as_slice(),
                own_ecdh.as_slice(),
                self.peer.id.as_slice(),
                self.we.id.as_slice(),
            ],
        )?;

        let master_key = kdf(&*shared_secret, MASTER_KEY_LABEL, &[session_id.as_slice()])?;

        verify_mac(
            &*master_key,
            &[own_ecdh.as_slice(), session_id.as_slice()],
            mac,
        )
        .map_err(|_| Error::InvalidParameter)?;

        let mac_out = compute_mac(
            &*master_key,
            &[self.peer.ecdh_key.as_slice(), session_id.as_slice()],
        )?;
        let frame = container::seal(PROTO_TAG, &mac_out);

        let keys = crate::record::MessageKeys::derive(&*master_key, self.is_client)?;
        self.session_id = Some(*session_id);
        self.master_key = Some(master_key);
        self.keys = Some(keys);

        self.transport.send_data(&frame)?;

        self.complete_establishment();
        Ok(())
    }

    /// Client: verify the server's final MAC and establish.
    fn on_finish_client_wait(&mut self, data: &[u8]) -> Result<()> {
        let outer =
            ContainerRef::parse_expecting(PROTO_TAG, data).map_err(|_| Error::InvalidParameter)?;

        let own_ecdh = self.own_ecdh()?.to_vec();
        let session_id = self.session_id.ok_or(Error::InvalidParameter)?;
        let master_key = self.master_key.as_ref().ok_or(Error::InvalidParameter)?;

        verify_mac(
            &**master_key,
            &[own_ecdh.as_slice(), session_id.as_slice()],
            outer.payload(),
        )
        .map_err(|_| Error::InvalidParameter)?;

        let keys = crate::record::MessageKeys::derive(&**master_key, self.is_client)?;
        self.keys = Some(keys);

        self.complete_establishment();
        Ok(())
    }

    /// Wipe everything a failed handshake may have accumulated. The state
    /// tag stays put; with the peer record and secrets gone, no further
    /// progress is possible.
    fn abort_handshake(&mut self) {
        self.peer.wipe();
        self.session_id = None;
        self.master_key = None;
        self.keys = None;
    }

    /// Drop the ephemeral keypair, flip to `Established` and notify.
    fn complete_establishment(&mut self) {
        self.ecdh = None;
        self.state = SessionState::Established;
        self.transport.on_state_changed(SessionState::Established);
    }

    fn own_ecdh(&self) -> Result<&[u8]> {
        Ok(self
            .ecdh
            .as_ref()
            .ok_or(Error::InvalidParameter)?
            .public_key_container())
    }

    /// Resolve and sanity-check the peer's signing key: must be a container
    /// with the EC public key tag prefix and a non-empty payload.
    fn lookup_peer_key(&mut self, peer_id: &[u8]) -> Result<Vec<u8>> {
        let key = self
            .transport
            .get_public_key_for_id(peer_id)
            .ok_or(Error::InvalidParameter)?;

        let parsed = ContainerRef::parse(&key).map_err(|_| Error::InvalidParameter)?;
        if !parsed.has_tag_prefix(EC_PUB_KEY_PREFIX) || parsed.total_len() <= HEADER_SIZE {
            return Err(Error::InvalidParameter);
        }
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsp_crypto::container::EC_PUB_KEY_TAG;

    fn sample_payload() -> Vec<u8> {
        let id_container = container::seal(ID_TAG, b"client");
        let ecdh_container = container::seal(EC_PUB_KEY_TAG, &[0x04; 65]);
        let mut payload = id_container;
        payload.extend_from_slice(&ecdh_container);
        payload.extend_from_slice(&[0xAB; SIGNATURE_SIZE]);
        payload
    }

    #[test]
    fn test_parse_key_agreement() {
        let payload = sample_payload();
        let fields = parse_key_agreement(&payload).unwrap();
        assert_eq!(fields.peer_id, b"client");
        assert_eq!(fields.signature.len(), SIGNATURE_SIZE);
        let ecdh = ContainerRef::parse(fields.peer_ecdh).unwrap();
        assert_eq!(ecdh.tag(), EC_PUB_KEY_TAG);
    }

    #[test]
    fn test_parse_key_agreement_rejects_missing_id() {
        let mut payload = container::seal(EC_PUB_KEY_TAG, &[0x04; 65]);
        payload.extend_from_slice(&[0xAB; SIGNATURE_SIZE]);
        assert!(parse_key_agreement(&payload).is_err());
    }

    #[test]
    fn test_parse_key_agreement_rejects_wrong_key_tag() {
        let id_container = container::seal(ID_TAG, b"client");
        let mut payload = id_container;
        payload.extend_from_slice(&container::seal(*b"XKEY", &[0x04; 65]));
        payload.extend_from_slice(&[0xAB; SIGNATURE_SIZE]);
        assert!(parse_key_agreement(&payload).is_err());
    }

    #[test]
    fn test_parse_key_agreement_rejects_short_signature() {
        let id_container = container::seal(ID_TAG, b"client");
        let mut payload = id_container;
        payload.extend_from_slice(&container::seal(EC_PUB_KEY_TAG, &[0x04; 65]));
        payload.extend_from_slice(&[0xAB; SIGNATURE_SIZE - 1]);
        assert!(parse_key_agreement(&payload).is_err());
    }

    #[test]
    fn test_frame_builder_composes_outer_last() {
        let ecdh_container = container::seal(EC_PUB_KEY_TAG, &[0x04; 65]);
        let frame =
            build_key_agreement_frame(b"client", &ecdh_container, &[0xAB; SIGNATURE_SIZE]);

        let outer = ContainerRef::parse_expecting(PROTO_TAG, &frame).unwrap();
        let fields = parse_key_agreement(outer.payload()).unwrap();
        assert_eq!(fields.peer_id, b"client");
        assert_eq!(fields.peer_ecdh, ecdh_container.as_slice());
    }
}
