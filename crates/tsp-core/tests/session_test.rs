//! Record layer and public API tests over established sessions.

mod common;

use common::{drive_handshake, session_pair};
use tsp_core::{wrapped_size, Error};

#[test]
fn test_client_echo() {
    let (mut client, mut server, _wire) = session_pair();
    drive_handshake(&mut client, &mut server).unwrap();

    assert_eq!(client.send(b"ping").unwrap(), 4);
    let mut dst = [0u8; 64];
    let n = server.receive(&mut dst).unwrap();
    assert_eq!(&dst[..n], b"ping");

    assert_eq!(server.send(b"pong").unwrap(), 4);
    let n = client.receive(&mut dst).unwrap();
    assert_eq!(&dst[..n], b"pong");
}

#[test]
fn test_roundtrip_various_sizes() {
    let (mut client, mut server, _wire) = session_pair();
    drive_handshake(&mut client, &mut server).unwrap();

    for size in [1usize, 2, 16, 255, 1024, 1500] {
        let message: Vec<u8> = (0..size).map(|byte| (byte % 251) as u8).collect();
        client.send(&message).unwrap();

        let mut dst = vec![0u8; size];
        let n = server.receive(&mut dst).unwrap();
        assert_eq!(n, size);
        assert_eq!(&dst[..n], message.as_slice());
    }
}

#[test]
fn test_large_message_roundtrip() {
    let (mut client, mut server, _wire) = session_pair();
    drive_handshake(&mut client, &mut server).unwrap();

    let message = vec![0xA5u8; 4096];
    client.send(&message).unwrap();

    let mut dst = vec![0u8; 8192];
    let n = server.receive(&mut dst).unwrap();
    assert_eq!(&dst[..n], message.as_slice());
}

#[test]
fn test_receive_reports_buffer_too_small() {
    let (mut client, mut server, _wire) = session_pair();
    drive_handshake(&mut client, &mut server).unwrap();

    // The record is far larger than the destination: it must still be read
    // and authenticated, with the required length reported.
    client.send(&[0x5Au8; 100]).unwrap();

    let mut small = [0u8; 10];
    match server.receive(&mut small) {
        Err(Error::BufferTooSmall { needed }) => assert_eq!(needed, 100),
        other => panic!("expected BufferTooSmall, got {:?}", other),
    }
}

#[test]
fn test_empty_message_rejected() {
    let (mut client, mut server, _wire) = session_pair();
    drive_handshake(&mut client, &mut server).unwrap();

    assert!(matches!(client.send(b""), Err(Error::InvalidParameter)));
    assert!(matches!(client.wrap(b""), Err(Error::InvalidParameter)));
}

#[test]
fn test_receive_with_empty_buffer_rejected() {
    let (mut client, mut server, _wire) = session_pair();
    drive_handshake(&mut client, &mut server).unwrap();

    client.send(b"pending").unwrap();
    let mut empty = [0u8; 0];
    assert!(matches!(
        server.receive(&mut empty),
        Err(Error::InvalidParameter)
    ));
}

#[test]
fn test_wrap_unwrap_public_api() {
    let (mut client, mut server, _wire) = session_pair();
    drive_handshake(&mut client, &mut server).unwrap();

    let frame = client.wrap(b"carried by hand").unwrap();
    assert_eq!(frame.len(), wrapped_size(15));

    let mut dst = [0u8; 64];
    let n = server.unwrap(&frame, &mut dst).unwrap();
    assert_eq!(&dst[..n], b"carried by hand");
}

#[test]
fn test_unwrap_buffer_too_small_is_retryable() {
    let (mut client, mut server, _wire) = session_pair();
    drive_handshake(&mut client, &mut server).unwrap();

    let frame = client.wrap(b"a message of 24 bytes...").unwrap();

    let mut small = [0u8; 8];
    match server.unwrap(&frame, &mut small) {
        Err(Error::BufferTooSmall { needed }) => assert_eq!(needed, 24),
        other => panic!("expected BufferTooSmall, got {:?}", other),
    }

    let mut dst = [0u8; 64];
    let n = server.unwrap(&frame, &mut dst).unwrap();
    assert_eq!(&dst[..n], b"a message of 24 bytes...");
}

#[test]
fn test_wrap_unwrap_require_establishment() {
    let (mut client, _server, _wire) = session_pair();

    assert!(matches!(client.wrap(b"early"), Err(Error::InvalidParameter)));
    let mut dst = [0u8; 16];
    assert!(matches!(
        client.unwrap(b"whatever", &mut dst),
        Err(Error::InvalidParameter)
    ));
}

#[test]
fn test_any_byte_flip_in_record_rejected() {
    let (mut client, mut server, _wire) = session_pair();
    drive_handshake(&mut client, &mut server).unwrap();

    let frame = client.wrap(b"integrity").unwrap();
    let mut dst = [0u8; 64];

    for position in 0..frame.len() {
        let mut tampered = frame.clone();
        tampered[position] ^= 0x01;
        assert!(
            server.unwrap(&tampered, &mut dst).is_err(),
            "record byte {} accepted after flip",
            position
        );
    }

    // None of the failures advanced the receive counter.
    let n = server.unwrap(&frame, &mut dst).unwrap();
    assert_eq!(&dst[..n], b"integrity");
}

#[test]
fn test_record_replay_rejected() {
    let (mut client, mut server, _wire) = session_pair();
    drive_handshake(&mut client, &mut server).unwrap();

    let frame = client.wrap(b"only once").unwrap();
    let mut dst = [0u8; 64];
    server.unwrap(&frame, &mut dst).unwrap();
    assert!(matches!(
        server.unwrap(&frame, &mut dst),
        Err(Error::InvalidParameter)
    ));
}

#[test]
fn test_many_messages_in_sequence() {
    let (mut client, mut server, _wire) = session_pair();
    drive_handshake(&mut client, &mut server).unwrap();

    let mut dst = [0u8; 64];
    for round in 0u32..50 {
        let message = format!("message number {}", round);
        client.send(message.as_bytes()).unwrap();
        let n = server.receive(&mut dst).unwrap();
        assert_eq!(&dst[..n], message.as_bytes());

        server.send(b"ack").unwrap();
        let n = client.receive(&mut dst).unwrap();
        assert_eq!(&dst[..n], b"ack");
    }
}
