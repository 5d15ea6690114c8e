//! Wire codec errors.

use thiserror::Error;

use super::{ClientId, ResponseCode};

/// Errors raised while encoding or decoding protocol structures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A declared size runs past the end of the buffer.
    #[error("Truncated data: needed {needed} bytes, {available} available")]
    Truncated {
        /// Bytes the structure declares.
        needed: usize,
        /// Bytes actually left in the buffer.
        available: usize,
    },

    /// An inbound envelope carries a type discriminant we don't know.
    ///
    /// Non-fatal: the envelope's size is still known, so the stream continues.
    #[error("Unknown message type {type_code} (message {message_id} from {sender_id})")]
    UnknownType {
        /// Raw type byte.
        type_code: u8,
        /// Sender named in the envelope.
        sender_id: ClientId,
        /// Server-assigned message id.
        message_id: u32,
    },

    /// A request or response code outside the protocol.
    #[error("Unknown protocol code: {0}")]
    UnknownCode(u16),

    /// A fixed-size payload has the wrong length.
    #[error("Invalid {what} length: expected {expected} bytes, got {got}")]
    InvalidLength {
        /// Which structure was being decoded.
        what: &'static str,
        /// Exact size the layout requires.
        expected: usize,
        /// Size received.
        got: usize,
    },

    /// The server answered with a valid code that doesn't match the request.
    #[error("Unexpected response: expected {expected:?}, got {got:?}")]
    UnexpectedResponse {
        /// Code the request calls for.
        expected: ResponseCode,
        /// Code received.
        got: ResponseCode,
    },

    /// A response names a different client than the one asked about.
    #[error("Response is for client {got}, expected {expected}")]
    PeerMismatch {
        /// Client the request named.
        expected: ClientId,
        /// Client the response named.
        got: ClientId,
    },

    /// A name doesn't fit the fixed 255-byte field.
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// A buffer is too large for a `u32` size field.
    #[error("Payload too large for the wire: {0} bytes")]
    PayloadTooLarge(usize),
}
