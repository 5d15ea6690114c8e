//! MessageU wire protocol.
//!
//! Every structure on the wire has a fixed, padding-free layout with
//! little-endian integers. Nothing here reinterprets buffers in place: each
//! header and payload has explicit field-by-field `encode`/`decode` functions.
//!
//! - [`header`]: request and response headers
//! - [`payload`]: fixed payloads for registration, directory and key lookups
//! - [`envelope`]: message envelopes, outbound and the inbound stream

mod codes;
mod envelope;
mod error;
mod header;
mod payload;

use std::fmt;

pub use codes::{MessageType, RequestCode, ResponseCode};
pub use envelope::{
    decode_envelope_stream, EnvelopeStream, InboundEnvelope, OutboundEnvelope, SendMessageRequest,
    INBOUND_ENVELOPE_HEADER_SIZE, OUTBOUND_ENVELOPE_HEADER_SIZE,
};
pub use error::ProtocolError;
pub use header::{
    decode_response, decode_response_header, encode_request, encode_response,
    response_payload_size, RequestHeader, ResponseHeader, REQUEST_HEADER_SIZE,
    RESPONSE_HEADER_SIZE,
};
pub use payload::{
    decode_client_list, decode_name, encode_client_list, encode_name, ClientListEntry,
    MessageSentResponse, PublicKeyRequest, PublicKeyResponse, RegistrationRequest,
    RegistrationSuccess, CLIENT_LIST_ENTRY_SIZE,
};

/// Size of a client identifier in bytes.
pub const CLIENT_ID_SIZE: usize = 16;

/// Size of the fixed username field in bytes.
pub const USERNAME_SIZE: usize = 255;

/// Size of the fixed public key field in bytes.
pub const PUBLIC_KEY_SIZE: usize = 160;

/// A public key as carried in the fixed 160-byte wire field.
pub type PublicKeyBytes = [u8; PUBLIC_KEY_SIZE];

/// Server-assigned 16-byte client identifier.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId([u8; CLIENT_ID_SIZE]);

impl ClientId {
    /// Wraps raw identifier bytes.
    pub const fn new(bytes: [u8; CLIENT_ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8; CLIENT_ID_SIZE] {
        &self.0
    }

    /// Parses an identifier from 32 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, ProtocolError> {
        let bytes = hex::decode(s.trim()).map_err(|_| ProtocolError::InvalidLength {
            what: "client id",
            expected: CLIENT_ID_SIZE,
            got: s.trim().len() / 2,
        })?;
        Self::try_from(bytes.as_slice())
    }

    /// Lower-case hex rendering (32 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl TryFrom<&[u8]> for ClientId {
    type Error = ProtocolError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let array: [u8; CLIENT_ID_SIZE] =
            bytes.try_into().map_err(|_| ProtocolError::InvalidLength {
                what: "client id",
                expected: CLIENT_ID_SIZE,
                got: bytes.len(),
            })?;
        Ok(Self(array))
    }
}

impl From<[u8; CLIENT_ID_SIZE]> for ClientId {
    fn from(bytes: [u8; CLIENT_ID_SIZE]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientId({})", self.to_hex())
    }
}

/// Sequential little-endian reader over a byte slice.
///
/// Every read is bounds-checked and fails with [`ProtocolError::Truncated`]
/// instead of reading past the end.
#[derive(Debug)]
pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if n > self.remaining() {
            return Err(ProtocolError::Truncated {
                needed: n,
                available: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub(crate) fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, ProtocolError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub(crate) fn read_client_id(&mut self) -> Result<ClientId, ProtocolError> {
        Ok(ClientId(self.read_array()?))
    }
}

/// Converts a buffer length into the `u32` size field used on the wire.
pub(crate) fn wire_size(len: usize) -> Result<u32, ProtocolError> {
    u32::try_from(len).map_err(|_| ProtocolError::PayloadTooLarge(len))
}
