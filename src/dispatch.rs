//! Message envelope dispatch.
//!
//! Inbound: each pulled envelope is classified by type and handled on its own.
//! Failures are reported in the envelope's [`InboundReport`] and never stop
//! the rest of the batch.
//!
//! Outbound: an [`OutboundIntent`] plus what we know about the recipient
//! becomes a ready-to-send envelope.

use std::fmt;
use std::path::PathBuf;

use rsa::RsaPrivateKey;
use tracing::{info, warn};

use crate::blob::BlobSink;
use crate::crypto::{
    decode_public_key, decrypt_payload, encrypt_payload, generate_symmetric_key, unwrap_key,
    wrap_key, CryptoError, SymmetricKey,
};
use crate::error::{ClientError, PreconditionError};
use crate::peers::{PeerRecord, PeerStore, UNKNOWN_PEER_NAME};
use crate::protocol::{ClientId, InboundEnvelope, MessageType, OutboundEnvelope, ProtocolError};

/// What happened to one inbound envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    /// The sender asks us for a session key.
    KeyRequested,
    /// The sender's session key was unwrapped and stored.
    KeyReceived,
    /// The session key could not be unwrapped; nothing was stored.
    KeyRejected(CryptoError),
    /// Decrypted text.
    Text(String),
    /// Decrypted file, written to this path.
    File(PathBuf),
    /// No session key with the sender.
    CannotDecrypt,
    /// A session key exists but decryption failed.
    DecryptFailed(CryptoError),
    /// The file decrypted but could not be written.
    FileNotStored(String),
    /// Type discriminant outside the protocol.
    UnknownType(u8),
    /// The envelope could not be decoded at all.
    Malformed(ProtocolError),
}

impl InboundOutcome {
    /// True when the envelope was handled as intended.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::KeyRequested | Self::KeyReceived | Self::Text(_) | Self::File(_)
        )
    }
}

/// Result of processing one inbound envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundReport {
    /// Absent when the envelope was too damaged to name its sender.
    pub sender_id: Option<ClientId>,
    pub sender_name: String,
    pub message_id: Option<u32>,
    pub outcome: InboundOutcome,
}

impl InboundReport {
    /// Builds the report for an envelope the stream decoder rejected.
    pub fn from_stream_error(error: ProtocolError, peers: &PeerStore) -> Self {
        match error {
            ProtocolError::UnknownType {
                type_code,
                sender_id,
                message_id,
            } => Self {
                sender_id: Some(sender_id),
                sender_name: sender_name(peers, &sender_id),
                message_id: Some(message_id),
                outcome: InboundOutcome::UnknownType(type_code),
            },
            other => Self {
                sender_id: None,
                sender_name: UNKNOWN_PEER_NAME.to_string(),
                message_id: None,
                outcome: InboundOutcome::Malformed(other),
            },
        }
    }
}

impl fmt::Display for InboundReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "From: {}", self.sender_name)?;
        writeln!(f, "Content:")?;
        match &self.outcome {
            InboundOutcome::KeyRequested => writeln!(f, "Request for symmetric key")?,
            InboundOutcome::KeyReceived => writeln!(f, "Symmetric key received")?,
            InboundOutcome::KeyRejected(e) => {
                writeln!(f, "Failed to decrypt symmetric key ({})", e)?
            }
            InboundOutcome::Text(text) => writeln!(f, "{}", text)?,
            InboundOutcome::File(path) => writeln!(f, "{}", path.display())?,
            InboundOutcome::CannotDecrypt => writeln!(f, "Can't decrypt message")?,
            InboundOutcome::DecryptFailed(e) => writeln!(f, "Can't decrypt message ({})", e)?,
            InboundOutcome::FileNotStored(reason) => {
                writeln!(f, "Failed to store file ({})", reason)?
            }
            InboundOutcome::UnknownType(code) => writeln!(f, "Unknown message type {}", code)?,
            InboundOutcome::Malformed(e) => writeln!(f, "Malformed message ({})", e)?,
        }
        write!(f, "-----<EOM>-----")
    }
}

fn sender_name(peers: &PeerStore, sender_id: &ClientId) -> String {
    peers
        .lookup(sender_id)
        .map(|p| p.display_name())
        .unwrap_or(UNKNOWN_PEER_NAME)
        .to_string()
}

/// Handles one inbound envelope.
///
/// The sender should already be resolved in `peers` as far as possible; an
/// unknown sender is reported as "Unknown" and the envelope is still handled.
/// Only a successfully unwrapped KEY_SEND mutates `peers`.
pub fn dispatch_inbound(
    envelope: InboundEnvelope,
    private_key: &RsaPrivateKey,
    peers: &mut PeerStore,
    sink: &mut dyn BlobSink,
) -> InboundReport {
    let sender_id = envelope.sender_id;
    let name = sender_name(peers, &sender_id);

    let outcome = match envelope.message_type {
        MessageType::SymKeyRequest => InboundOutcome::KeyRequested,
        MessageType::SymKeySend => match unwrap_key(private_key, &envelope.content) {
            Ok(key) => {
                peers.set_symmetric_key(sender_id, key);
                info!(peer = %sender_id, peer_name = %name, "session key received");
                InboundOutcome::KeyReceived
            }
            Err(e) => {
                warn!(peer = %sender_id, error = %e, "rejected session key");
                InboundOutcome::KeyRejected(e)
            }
        },
        MessageType::TextMessage | MessageType::FileSend => {
            match peers.lookup(&sender_id).and_then(|p| p.symmetric_key.as_ref()) {
                None => {
                    warn!(peer = %sender_id, message_id = envelope.message_id, "no session key, cannot decrypt");
                    InboundOutcome::CannotDecrypt
                }
                Some(key) => decrypt_content(envelope.message_type, key, &envelope.content, sink),
            }
        }
    };

    InboundReport {
        sender_id: Some(sender_id),
        sender_name: name,
        message_id: Some(envelope.message_id),
        outcome,
    }
}

fn decrypt_content(
    message_type: MessageType,
    key: &SymmetricKey,
    content: &[u8],
    sink: &mut dyn BlobSink,
) -> InboundOutcome {
    let plain = match decrypt_payload(key, content) {
        Ok(plain) => plain,
        Err(e) => {
            warn!(error = %e, "payload decryption failed");
            return InboundOutcome::DecryptFailed(e);
        }
    };

    if message_type == MessageType::TextMessage {
        return InboundOutcome::Text(String::from_utf8_lossy(&plain).into_owned());
    }

    match sink.store(&plain) {
        Ok(path) => InboundOutcome::File(path),
        Err(e) => {
            warn!(error = %e, "failed to store received file");
            InboundOutcome::FileNotStored(e.to_string())
        }
    }
}

/// Something the user wants delivered to a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundIntent {
    /// Ask the peer for a session key.
    KeyRequest,
    /// Generate a fresh session key and send it wrapped to the peer.
    KeySend,
    Text(String),
    File(Vec<u8>),
}

impl OutboundIntent {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::KeyRequest => MessageType::SymKeyRequest,
            Self::KeySend => MessageType::SymKeySend,
            Self::Text(_) => MessageType::TextMessage,
            Self::File(_) => MessageType::FileSend,
        }
    }
}

/// An envelope ready to send.
#[derive(Debug)]
pub struct OutboundMessage {
    pub envelope: OutboundEnvelope,
    /// For KEY_SEND: the new session key, to be stored once the server
    /// confirms delivery.
    pub pending_key: Option<SymmetricKey>,
}

/// Builds the envelope for `intent` addressed to `recipient`.
///
/// TEXT and FILE need a session key with the recipient; KEY_SEND needs its
/// public key. Neither is fetched here.
pub fn build_outbound(
    intent: OutboundIntent,
    recipient: &PeerRecord,
) -> Result<OutboundMessage, ClientError> {
    let message_type = intent.message_type();
    let (content, pending_key) = match intent {
        OutboundIntent::KeyRequest => (Vec::new(), None),
        OutboundIntent::KeySend => {
            let field = recipient.public_key.as_ref().ok_or_else(|| {
                PreconditionError::MissingPublicKey(recipient.display_name().to_string())
            })?;
            let public_key = decode_public_key(field)?;
            let key = generate_symmetric_key();
            (wrap_key(&public_key, &key)?, Some(key))
        }
        OutboundIntent::Text(text) => (
            encrypt_payload(session_key(recipient)?, text.as_bytes())?,
            None,
        ),
        OutboundIntent::File(bytes) => (encrypt_payload(session_key(recipient)?, &bytes)?, None),
    };

    Ok(OutboundMessage {
        envelope: OutboundEnvelope {
            recipient_id: recipient.peer_id,
            message_type,
            content,
        },
        pending_key,
    })
}

fn session_key(recipient: &PeerRecord) -> Result<&SymmetricKey, PreconditionError> {
    recipient.symmetric_key.as_ref().ok_or_else(|| {
        PreconditionError::MissingSymmetricKey(recipient.display_name().to_string())
    })
}
