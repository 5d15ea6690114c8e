//! Client error types.

use thiserror::Error;

use crate::blob::BlobError;
use crate::crypto::CryptoError;
use crate::identity::IdentityError;
use crate::protocol::{ClientId, ProtocolError};
use crate::transport::TransportError;

/// The server reported failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServerError {
    #[error("Server responded with an error")]
    GeneralError,
}

/// An operation can't proceed with the current local state.
///
/// Raised before the request that would need the missing piece is sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("Unknown client: {0}")]
    UnknownPeer(String),

    #[error("No session key with {0}; exchange keys first")]
    MissingSymmetricKey(String),

    #[error("No public key for {0}")]
    MissingPublicKey(String),

    #[error("Not registered; register first")]
    NotRegistered,

    #[error("Already registered as {0}")]
    AlreadyRegistered(String),

    #[error("Invalid username: {0}")]
    InvalidUsername(String),
}

/// Errors returned by [`Client`](crate::client::Client) operations.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Server(#[from] ServerError),

    #[error("{0}")]
    Precondition(#[from] PreconditionError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("File error: {0}")]
    Blob(#[from] BlobError),
}

impl ClientError {
    /// True when nothing reached the network.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }

    pub(crate) fn peer_mismatch(expected: ClientId, got: ClientId) -> Self {
        Self::Protocol(ProtocolError::PeerMismatch { expected, got })
    }
}
