//! Fixed-layout request and response payloads.

use super::{
    ByteReader, ClientId, ProtocolError, PublicKeyBytes, CLIENT_ID_SIZE, PUBLIC_KEY_SIZE,
    USERNAME_SIZE,
};

/// Size of one `client_id[16] | name[255]` entry in a client list.
pub const CLIENT_LIST_ENTRY_SIZE: usize = CLIENT_ID_SIZE + USERNAME_SIZE;

/// Encodes `name` into the fixed 255-byte NUL-padded field.
///
/// The name must be non-empty, contain no NUL and fit in 255 bytes. A name
/// that fills the whole field carries no terminator.
pub fn encode_name(name: &str) -> Result<[u8; USERNAME_SIZE], ProtocolError> {
    let bytes = name.as_bytes();
    if bytes.is_empty() {
        return Err(ProtocolError::InvalidName("name is empty".to_string()));
    }
    if bytes.contains(&0) {
        return Err(ProtocolError::InvalidName(
            "name contains a NUL byte".to_string(),
        ));
    }
    if bytes.len() > USERNAME_SIZE {
        return Err(ProtocolError::InvalidName(format!(
            "name is {} bytes, at most {} allowed",
            bytes.len(),
            USERNAME_SIZE
        )));
    }
    let mut field = [0u8; USERNAME_SIZE];
    field[..bytes.len()].copy_from_slice(bytes);
    Ok(field)
}

/// Decodes a fixed name field, stopping at the first NUL.
pub fn decode_name(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

fn expect_len(what: &'static str, bytes: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if bytes.len() != expected {
        return Err(ProtocolError::InvalidLength {
            what,
            expected,
            got: bytes.len(),
        });
    }
    Ok(())
}

/// REGISTER payload: `name[255] | public_key[160]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub name: String,
    pub public_key: PublicKeyBytes,
}

impl RegistrationRequest {
    pub const SIZE: usize = USERNAME_SIZE + PUBLIC_KEY_SIZE;

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut out = Vec::with_capacity(Self::SIZE);
        out.extend_from_slice(&encode_name(&self.name)?);
        out.extend_from_slice(&self.public_key);
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        expect_len("registration request", bytes, Self::SIZE)?;
        let mut reader = ByteReader::new(bytes);
        let name = decode_name(reader.take(USERNAME_SIZE)?);
        let public_key = reader.read_array()?;
        Ok(Self { name, public_key })
    }
}

/// PUBLIC_KEY request payload: the client id whose key is wanted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKeyRequest {
    pub client_id: ClientId,
}

impl PublicKeyRequest {
    pub fn encode(&self) -> Vec<u8> {
        self.client_id.as_bytes().to_vec()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        expect_len("public key request", bytes, CLIENT_ID_SIZE)?;
        Ok(Self {
            client_id: ClientId::try_from(bytes)?,
        })
    }
}

/// REGISTRATION_SUCCESS payload: the newly assigned id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationSuccess {
    pub client_id: ClientId,
}

impl RegistrationSuccess {
    pub fn encode(&self) -> Vec<u8> {
        self.client_id.as_bytes().to_vec()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        expect_len("registration response", bytes, CLIENT_ID_SIZE)?;
        Ok(Self {
            client_id: ClientId::try_from(bytes)?,
        })
    }
}

/// One entry of a CLIENTS_LIST response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientListEntry {
    pub client_id: ClientId,
    pub name: String,
}

/// Encodes a CLIENTS_LIST payload.
pub fn encode_client_list(entries: &[ClientListEntry]) -> Result<Vec<u8>, ProtocolError> {
    let mut out = Vec::with_capacity(entries.len() * CLIENT_LIST_ENTRY_SIZE);
    for entry in entries {
        out.extend_from_slice(entry.client_id.as_bytes());
        out.extend_from_slice(&encode_name(&entry.name)?);
    }
    Ok(out)
}

/// Decodes a CLIENTS_LIST payload.
///
/// A payload whose length is not a whole number of entries is rejected as a
/// whole; no partial list is returned.
pub fn decode_client_list(bytes: &[u8]) -> Result<Vec<ClientListEntry>, ProtocolError> {
    let remainder = bytes.len() % CLIENT_LIST_ENTRY_SIZE;
    if remainder != 0 {
        return Err(ProtocolError::Truncated {
            needed: CLIENT_LIST_ENTRY_SIZE,
            available: remainder,
        });
    }

    let mut reader = ByteReader::new(bytes);
    let mut entries = Vec::with_capacity(bytes.len() / CLIENT_LIST_ENTRY_SIZE);
    while reader.remaining() > 0 {
        let client_id = reader.read_client_id()?;
        let name = decode_name(reader.take(USERNAME_SIZE)?);
        entries.push(ClientListEntry { client_id, name });
    }
    Ok(entries)
}

/// PUBLIC_KEY response payload: `client_id[16] | public_key[160]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyResponse {
    pub client_id: ClientId,
    pub public_key: PublicKeyBytes,
}

impl PublicKeyResponse {
    pub const SIZE: usize = CLIENT_ID_SIZE + PUBLIC_KEY_SIZE;

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        out.extend_from_slice(self.client_id.as_bytes());
        out.extend_from_slice(&self.public_key);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        expect_len("public key response", bytes, Self::SIZE)?;
        let mut reader = ByteReader::new(bytes);
        Ok(Self {
            client_id: reader.read_client_id()?,
            public_key: reader.read_array()?,
        })
    }
}

/// MESSAGE_SENT response payload: `client_id[16] | message_id:u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageSentResponse {
    pub client_id: ClientId,
    pub message_id: u32,
}

impl MessageSentResponse {
    pub const SIZE: usize = CLIENT_ID_SIZE + 4;

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        out.extend_from_slice(self.client_id.as_bytes());
        out.extend_from_slice(&self.message_id.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        expect_len("message sent response", bytes, Self::SIZE)?;
        let mut reader = ByteReader::new(bytes);
        Ok(Self {
            client_id: reader.read_client_id()?,
            message_id: reader.read_u32()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_field_padding() {
        let field = encode_name("alice").unwrap();
        assert_eq!(&field[..5], b"alice");
        assert!(field[5..].iter().all(|&b| b == 0));
        assert_eq!(decode_name(&field), "alice");
    }

    #[test]
    fn test_name_field_rejects_bad_names() {
        assert!(encode_name("").is_err());
        assert!(encode_name("a\0b").is_err());
        assert!(encode_name(&"x".repeat(256)).is_err());
        assert!(encode_name(&"x".repeat(255)).is_ok());
    }

    #[test]
    fn test_decode_name_without_terminator() {
        let field = [b'z'; USERNAME_SIZE];
        assert_eq!(decode_name(&field).len(), USERNAME_SIZE);
    }

    #[test]
    fn test_registration_request_roundtrip() {
        let request = RegistrationRequest {
            name: "alice".to_string(),
            public_key: [0x42; PUBLIC_KEY_SIZE],
        };
        let bytes = request.encode().unwrap();
        assert_eq!(bytes.len(), 415);
        assert_eq!(RegistrationRequest::decode(&bytes).unwrap(), request);
    }

    #[test]
    fn test_client_list_roundtrip() {
        let entries = vec![
            ClientListEntry {
                client_id: ClientId::new([1; 16]),
                name: "alice".to_string(),
            },
            ClientListEntry {
                client_id: ClientId::new([2; 16]),
                name: "bob".to_string(),
            },
        ];
        let bytes = encode_client_list(&entries).unwrap();
        assert_eq!(bytes.len(), 2 * CLIENT_LIST_ENTRY_SIZE);
        assert_eq!(decode_client_list(&bytes).unwrap(), entries);
    }

    #[test]
    fn test_client_list_empty() {
        assert!(decode_client_list(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_client_list_partial_entry_is_truncated() {
        let entries = vec![ClientListEntry {
            client_id: ClientId::new([1; 16]),
            name: "alice".to_string(),
        }];
        let mut bytes = encode_client_list(&entries).unwrap();
        bytes.extend_from_slice(&[0u8; 10]);

        assert_eq!(
            decode_client_list(&bytes).unwrap_err(),
            ProtocolError::Truncated {
                needed: CLIENT_LIST_ENTRY_SIZE,
                available: 10
            }
        );
    }

    #[test]
    fn test_public_key_response_length_checked() {
        let response = PublicKeyResponse {
            client_id: ClientId::new([5; 16]),
            public_key: [9; PUBLIC_KEY_SIZE],
        };
        let bytes = response.encode();
        assert_eq!(PublicKeyResponse::decode(&bytes).unwrap(), response);
        assert!(matches!(
            PublicKeyResponse::decode(&bytes[..100]),
            Err(ProtocolError::InvalidLength { got: 100, .. })
        ));
    }

    #[test]
    fn test_message_sent_response_layout() {
        let response = MessageSentResponse {
            client_id: ClientId::new([5; 16]),
            message_id: 0x0102_0304,
        };
        let bytes = response.encode();
        assert_eq!(&bytes[16..], &[4, 3, 2, 1]);
        assert_eq!(MessageSentResponse::decode(&bytes).unwrap(), response);
    }
}
