//! Container framing: the tagged, checksummed envelope used on the wire.
//!
//! Every wire message and every piece of key material is carried in a
//! container:
//!
//! ```text
//! Container
//! ┌──────────────────────────────────────────────────┐
//! │ tag      : [u8; 4]  ASCII mnemonic   [4 bytes]   │
//! │ size     : u32 big-endian, total     [4 bytes]   │
//! │            length including header               │
//! │ checksum : u32 big-endian, XXH32     [4 bytes]   │
//! │            over tag ‖ size ‖ payload             │
//! │ payload  : size - 12 bytes                       │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! Parsing never trusts a declared field before validating it: the buffer
//! must hold a full header, the declared size must fit inside the buffer,
//! and the checksum must verify. Only then is the payload sliced out.
//!
//! The checksum guards against framing corruption only; authenticity of
//! container contents is the business of signatures, MACs and AEAD tags.

use crate::{Error, Result};
use std::hash::Hasher;
use twox_hash::XxHash32;

/// Container tag length in bytes.
pub const TAG_SIZE: usize = 4;

/// Container header length in bytes (tag + size + checksum).
pub const HEADER_SIZE: usize = 12;

/// Tag for P-256 public key containers ("UEC2").
pub const EC_PUB_KEY_TAG: [u8; 4] = *b"UEC2";

/// Tag for P-256 private key containers ("REC2").
pub const EC_PRIV_KEY_TAG: [u8; 4] = *b"REC2";

/// Tag prefix shared by all EC public key containers.
pub const EC_PUB_KEY_PREFIX: &[u8] = b"UEC";

/// A parsed, validated view into a single container within a buffer.
///
/// Holds a slice of the container's payload only; `total_len` reports how
/// many bytes of the underlying buffer the container occupies, so that
/// concatenated containers can be walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerRef<'a> {
    tag: [u8; 4],
    total_len: usize,
    payload: &'a [u8],
}

impl<'a> ContainerRef<'a> {
    /// Parse and validate the container at the start of `data`.
    ///
    /// `data` may extend past the container; trailing bytes are ignored.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidContainer` if the buffer is shorter than a
    /// header, the declared size is smaller than a header or larger than the
    /// buffer, or the checksum does not verify.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::InvalidContainer(format!(
                "buffer too short for header: {} bytes",
                data.len()
            )));
        }

        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&data[0..TAG_SIZE]);

        let size = u32::from_be_bytes([data[4], data[5], data[6], data[7]]) as usize;
        if size < HEADER_SIZE {
            return Err(Error::InvalidContainer(format!(
                "declared size {} smaller than header",
                size
            )));
        }
        if size > data.len() {
            return Err(Error::InvalidContainer(format!(
                "declared size {} exceeds buffer of {} bytes",
                size,
                data.len()
            )));
        }

        let declared = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);
        let payload = &data[HEADER_SIZE..size];
        if checksum(&tag, size as u32, payload) != declared {
            return Err(Error::InvalidContainer("checksum mismatch".into()));
        }

        Ok(Self {
            tag,
            total_len: size,
            payload,
        })
    }

    /// Parse the container at the start of `data`, requiring `tag`.
    ///
    /// # Errors
    ///
    /// As [`ContainerRef::parse`], plus `Error::InvalidContainer` on a tag
    /// mismatch.
    pub fn parse_expecting(tag: [u8; 4], data: &'a [u8]) -> Result<Self> {
        let container = Self::parse(data)?;
        if container.tag != tag {
            return Err(Error::InvalidContainer(format!(
                "unexpected tag {:02x?}",
                container.tag
            )));
        }
        Ok(container)
    }

    /// The container's 4-byte tag.
    pub fn tag(&self) -> [u8; 4] {
        self.tag
    }

    /// True if the tag starts with `prefix`.
    pub fn has_tag_prefix(&self, prefix: &[u8]) -> bool {
        prefix.len() <= TAG_SIZE && &self.tag[..prefix.len()] == prefix
    }

    /// The validated payload bytes.
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Total on-wire length of this container, header included.
    pub fn total_len(&self) -> usize {
        self.total_len
    }
}

/// Serialize `payload` into a container with the given tag.
pub fn seal(tag: [u8; 4], payload: &[u8]) -> Vec<u8> {
    let size = (HEADER_SIZE + payload.len()) as u32;
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&tag);
    buf.extend_from_slice(&size.to_be_bytes());
    buf.extend_from_slice(&checksum(&tag, size, payload).to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

fn checksum(tag: &[u8; 4], size: u32, payload: &[u8]) -> u32 {
    let mut hasher = XxHash32::with_seed(0);
    hasher.write(tag);
    hasher.write(&size.to_be_bytes());
    hasher.write(payload);
    hasher.finish() as u32
}
