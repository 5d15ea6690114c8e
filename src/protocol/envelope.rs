//! Message envelopes.
//!
//! Outbound (SEND_MESSAGE payload):
//! `recipient_id[16] | type:u8 | content_size:u32 | content`
//!
//! Inbound (one PULL_MESSAGES entry, repeated until the payload is exhausted):
//! `sender_id[16] | message_id:u32 | type:u8 | content_size:u32 | content`

use super::{wire_size, ByteReader, ClientId, MessageType, ProtocolError, CLIENT_ID_SIZE};

/// Size of the fixed part of an outbound envelope.
pub const OUTBOUND_ENVELOPE_HEADER_SIZE: usize = CLIENT_ID_SIZE + 1 + 4;

/// Size of the fixed part of an inbound envelope.
pub const INBOUND_ENVELOPE_HEADER_SIZE: usize = CLIENT_ID_SIZE + 4 + 1 + 4;

/// A message addressed to another client; the SEND_MESSAGE request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEnvelope {
    pub recipient_id: ClientId,
    pub message_type: MessageType,
    pub content: Vec<u8>,
}

impl OutboundEnvelope {
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let size = wire_size(self.content.len())?;
        let mut out = Vec::with_capacity(OUTBOUND_ENVELOPE_HEADER_SIZE + self.content.len());
        out.extend_from_slice(self.recipient_id.as_bytes());
        out.push(self.message_type.as_u8());
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&self.content);
        Ok(out)
    }

    /// Decodes a SEND_MESSAGE payload. Trailing bytes past the declared
    /// content size are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = ByteReader::new(bytes);
        let recipient_id = reader.read_client_id()?;
        let type_code = reader.read_u8()?;
        let size = reader.read_u32()? as usize;
        let content = reader.take(size)?.to_vec();
        let message_type = MessageType::from_u8(type_code).ok_or(ProtocolError::UnknownType {
            type_code,
            sender_id: ClientId::default(),
            message_id: 0,
        })?;
        Ok(Self {
            recipient_id,
            message_type,
            content,
        })
    }
}

/// SEND_MESSAGE request payload.
pub type SendMessageRequest = OutboundEnvelope;

/// A message waiting for us on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEnvelope {
    pub sender_id: ClientId,
    pub message_id: u32,
    pub message_type: MessageType,
    pub content: Vec<u8>,
}

impl InboundEnvelope {
    /// Appends this envelope to a PULL_MESSAGES payload.
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
        let size = wire_size(self.content.len())?;
        out.extend_from_slice(self.sender_id.as_bytes());
        out.extend_from_slice(&self.message_id.to_le_bytes());
        out.push(self.message_type.as_u8());
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&self.content);
        Ok(())
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut out = Vec::with_capacity(INBOUND_ENVELOPE_HEADER_SIZE + self.content.len());
        self.encode_into(&mut out)?;
        Ok(out)
    }
}

/// Lazy decoder over a PULL_MESSAGES payload.
///
/// Yields one item per envelope. An envelope with an unknown type yields
/// [`ProtocolError::UnknownType`] and the stream moves past it, since its size
/// is known. A truncated envelope yields [`ProtocolError::Truncated`] and ends
/// the stream.
#[derive(Debug)]
pub struct EnvelopeStream<'a> {
    reader: ByteReader<'a>,
    done: bool,
}

impl<'a> EnvelopeStream<'a> {
    fn next_envelope(&mut self) -> Result<InboundEnvelope, ProtocolError> {
        let sender_id = self.reader.read_client_id()?;
        let message_id = self.reader.read_u32()?;
        let type_code = self.reader.read_u8()?;
        let size = self.reader.read_u32()? as usize;
        let content = self.reader.take(size)?;

        let message_type = MessageType::from_u8(type_code).ok_or(ProtocolError::UnknownType {
            type_code,
            sender_id,
            message_id,
        })?;

        Ok(InboundEnvelope {
            sender_id,
            message_id,
            message_type,
            content: content.to_vec(),
        })
    }
}

impl Iterator for EnvelopeStream<'_> {
    type Item = Result<InboundEnvelope, ProtocolError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.reader.remaining() == 0 {
            return None;
        }
        let item = self.next_envelope();
        if matches!(item, Err(ProtocolError::Truncated { .. })) {
            self.done = true;
        }
        Some(item)
    }
}

impl std::iter::FusedIterator for EnvelopeStream<'_> {}

/// Starts decoding a PULL_MESSAGES payload.
pub fn decode_envelope_stream(bytes: &[u8]) -> EnvelopeStream<'_> {
    EnvelopeStream {
        reader: ByteReader::new(bytes),
        done: false,
    }
}
