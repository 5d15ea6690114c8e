//! Request codes, response codes and message type discriminants.

use super::ProtocolError;

/// Operation requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum RequestCode {
    Register = 1100,
    ClientsList = 1101,
    PublicKey = 1102,
    SendMessage = 1103,
    PullMessages = 1104,
}

impl RequestCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

impl TryFrom<u16> for RequestCode {
    type Error = ProtocolError;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            1100 => Ok(Self::Register),
            1101 => Ok(Self::ClientsList),
            1102 => Ok(Self::PublicKey),
            1103 => Ok(Self::SendMessage),
            1104 => Ok(Self::PullMessages),
            other => Err(ProtocolError::UnknownCode(other)),
        }
    }
}

/// Result code sent back by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ResponseCode {
    RegistrationSuccess = 2100,
    ClientsList = 2101,
    PublicKey = 2102,
    MessageSent = 2103,
    PullMessages = 2104,
    /// Operation failed; the payload is empty.
    GeneralError = 9000,
}

impl ResponseCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

impl TryFrom<u16> for ResponseCode {
    type Error = ProtocolError;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            2100 => Ok(Self::RegistrationSuccess),
            2101 => Ok(Self::ClientsList),
            2102 => Ok(Self::PublicKey),
            2103 => Ok(Self::MessageSent),
            2104 => Ok(Self::PullMessages),
            9000 => Ok(Self::GeneralError),
            other => Err(ProtocolError::UnknownCode(other)),
        }
    }
}

/// Envelope content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Ask the peer to send us a session key. No content.
    SymKeyRequest = 1,
    /// RSA-wrapped AES session key.
    SymKeySend = 2,
    /// AES-CBC encrypted text.
    TextMessage = 3,
    /// AES-CBC encrypted file contents.
    FileSend = 4,
}

impl MessageType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns `None` for discriminants outside the protocol.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::SymKeyRequest),
            2 => Some(Self::SymKeySend),
            3 => Some(Self::TextMessage),
            4 => Some(Self::FileSend),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_codes_match_protocol() {
        assert_eq!(RequestCode::Register.as_u16(), 1100);
        assert_eq!(RequestCode::PullMessages.as_u16(), 1104);
        assert_eq!(RequestCode::try_from(1102).unwrap(), RequestCode::PublicKey);
        assert_eq!(
            RequestCode::try_from(1200),
            Err(ProtocolError::UnknownCode(1200))
        );
    }

    #[test]
    fn test_response_codes_match_protocol() {
        assert_eq!(ResponseCode::GeneralError.as_u16(), 9000);
        assert_eq!(
            ResponseCode::try_from(2103).unwrap(),
            ResponseCode::MessageSent
        );
        assert!(ResponseCode::try_from(2105).is_err());
    }

    #[test]
    fn test_message_type_discriminants() {
        for value in 1..=4u8 {
            let kind = MessageType::from_u8(value).unwrap();
            assert_eq!(kind.as_u8(), value);
        }
        assert_eq!(MessageType::from_u8(0), None);
        assert_eq!(MessageType::from_u8(5), None);
    }
}
