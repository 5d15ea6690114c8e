//! Request and response headers.
//!
//! ```text
//! request:  client_id[16] | version:u8 | code:u16 | payload_size:u32   (23 bytes)
//! response: version:u8 | code:u16 | payload_size:u32                   (7 bytes)
//! ```

use super::{
    wire_size, ByteReader, ClientId, ProtocolError, RequestCode, ResponseCode, CLIENT_ID_SIZE,
};
use crate::PROTOCOL_VERSION;

/// Size of an encoded request header.
pub const REQUEST_HEADER_SIZE: usize = CLIENT_ID_SIZE + 1 + 2 + 4;

/// Size of an encoded response header.
pub const RESPONSE_HEADER_SIZE: usize = 1 + 2 + 4;

/// Header prefixed to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    pub client_id: ClientId,
    pub version: u8,
    pub code: RequestCode,
    pub payload_size: u32,
}

impl RequestHeader {
    pub fn to_bytes(&self) -> [u8; REQUEST_HEADER_SIZE] {
        let mut out = [0u8; REQUEST_HEADER_SIZE];
        out[..16].copy_from_slice(self.client_id.as_bytes());
        out[16] = self.version;
        out[17..19].copy_from_slice(&self.code.as_u16().to_le_bytes());
        out[19..23].copy_from_slice(&self.payload_size.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = ByteReader::new(bytes);
        let client_id = reader.read_client_id()?;
        let version = reader.read_u8()?;
        let code = RequestCode::try_from(reader.read_u16()?)?;
        let payload_size = reader.read_u32()?;
        Ok(Self {
            client_id,
            version,
            code,
            payload_size,
        })
    }
}

/// Header prefixed to every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    pub version: u8,
    pub code: ResponseCode,
    pub payload_size: u32,
}

impl ResponseHeader {
    pub fn to_bytes(&self) -> [u8; RESPONSE_HEADER_SIZE] {
        let mut out = [0u8; RESPONSE_HEADER_SIZE];
        out[0] = self.version;
        out[1..3].copy_from_slice(&self.code.as_u16().to_le_bytes());
        out[3..7].copy_from_slice(&self.payload_size.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = ByteReader::new(bytes);
        let version = reader.read_u8()?;
        let code = ResponseCode::try_from(reader.read_u16()?)?;
        let payload_size = reader.read_u32()?;
        Ok(Self {
            version,
            code,
            payload_size,
        })
    }
}

/// Builds a complete request: header followed by `payload`.
pub fn encode_request(
    code: RequestCode,
    sender_id: ClientId,
    payload: &[u8],
) -> Result<Vec<u8>, ProtocolError> {
    let header = RequestHeader {
        client_id: sender_id,
        version: PROTOCOL_VERSION,
        code,
        payload_size: wire_size(payload.len())?,
    };
    let mut out = Vec::with_capacity(REQUEST_HEADER_SIZE + payload.len());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Decodes the leading response header of `bytes`.
pub fn decode_response_header(bytes: &[u8]) -> Result<ResponseHeader, ProtocolError> {
    ResponseHeader::from_bytes(bytes)
}

/// Decodes a full response into its header and exactly `payload_size` bytes of body.
pub fn decode_response(bytes: &[u8]) -> Result<(ResponseHeader, &[u8]), ProtocolError> {
    let header = decode_response_header(bytes)?;
    let body = &bytes[RESPONSE_HEADER_SIZE..];
    let size = header.payload_size as usize;
    if body.len() < size {
        return Err(ProtocolError::Truncated {
            needed: size,
            available: body.len(),
        });
    }
    Ok((header, &body[..size]))
}

/// Builds a complete response. Used by servers and test doubles.
pub fn encode_response(code: ResponseCode, payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let header = ResponseHeader {
        version: PROTOCOL_VERSION,
        code,
        payload_size: wire_size(payload.len())?,
    };
    let mut out = Vec::with_capacity(RESPONSE_HEADER_SIZE + payload.len());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Reads the declared payload size from a raw response header without
/// validating the code. Lets a transport size its second read.
pub fn response_payload_size(header: &[u8; RESPONSE_HEADER_SIZE]) -> u32 {
    u32::from_le_bytes([header[3], header[4], header[5], header[6]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_header_layout() {
        let id = ClientId::new([7u8; 16]);
        let bytes = encode_request(RequestCode::PublicKey, id, &[0xAA; 16]).unwrap();

        assert_eq!(bytes.len(), REQUEST_HEADER_SIZE + 16);
        assert_eq!(&bytes[..16], &[7u8; 16]);
        assert_eq!(bytes[16], PROTOCOL_VERSION);
        // 1102 = 0x044E, little-endian
        assert_eq!(&bytes[17..19], &[0x4E, 0x04]);
        assert_eq!(&bytes[19..23], &[16, 0, 0, 0]);
        assert_eq!(&bytes[23..], &[0xAA; 16]);
    }

    #[test]
    fn test_request_header_roundtrip() {
        let header = RequestHeader {
            client_id: ClientId::new([3u8; 16]),
            version: PROTOCOL_VERSION,
            code: RequestCode::SendMessage,
            payload_size: 70_000,
        };
        assert_eq!(RequestHeader::from_bytes(&header.to_bytes()).unwrap(), header);
    }

    #[test]
    fn test_decode_response_splits_body() {
        let bytes = encode_response(ResponseCode::RegistrationSuccess, &[9u8; 16]).unwrap();
        let (header, body) = decode_response(&bytes).unwrap();

        assert_eq!(header.version, PROTOCOL_VERSION);
        assert_eq!(header.code, ResponseCode::RegistrationSuccess);
        assert_eq!(header.payload_size, 16);
        assert_eq!(body, &[9u8; 16]);
    }

    #[test]
    fn test_decode_response_short_body() {
        let mut bytes = encode_response(ResponseCode::PublicKey, &[0u8; 176]).unwrap();
        bytes.truncate(RESPONSE_HEADER_SIZE + 100);

        assert_eq!(
            decode_response(&bytes).unwrap_err(),
            ProtocolError::Truncated {
                needed: 176,
                available: 100
            }
        );
    }

    #[test]
    fn test_decode_response_unknown_code() {
        let bytes = [2u8, 0x39, 0x05, 0, 0, 0, 0]; // 1337
        assert_eq!(
            decode_response_header(&bytes).unwrap_err(),
            ProtocolError::UnknownCode(1337)
        );
    }

    #[test]
    fn test_general_error_has_empty_payload() {
        let bytes = encode_response(ResponseCode::GeneralError, &[]).unwrap();
        assert_eq!(bytes, vec![2, 0x28, 0x23, 0, 0, 0, 0]);
    }

    #[test]
    fn test_response_payload_size_peek() {
        let bytes = encode_response(ResponseCode::PullMessages, &[1u8; 300]).unwrap();
        let mut head = [0u8; RESPONSE_HEADER_SIZE];
        head.copy_from_slice(&bytes[..RESPONSE_HEADER_SIZE]);
        assert_eq!(response_payload_size(&head), 300);
    }
}
