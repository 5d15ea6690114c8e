//! MessageU - end-to-end encrypted messaging client
//!
//! A client for the MessageU store-and-forward server. The server relays
//! opaque envelopes between registered clients; everything it relays is
//! encrypted on the client side.
//!
//! ## How it works
//!
//! 1. **Register**: generate an RSA-1024 key pair, send the public half with a
//!    username, and receive a 16-byte client id. Id, name and private key are
//!    saved to `my.info`.
//!
//! 2. **Discover**: fetch the directory of registered clients and their
//!    public keys on demand.
//!
//! 3. **Exchange keys**: a random AES-128 session key is wrapped with the
//!    peer's RSA public key (PKCS#1 v1.5) and sent as a key message.
//!
//! 4. **Talk**: text and files are encrypted with the session key
//!    (AES-128-CBC, PKCS#7) and queued on the server until the peer pulls.
//!
//! ## Security notes
//!
//! - Public keys are trusted on first use; a later, different key from the
//!   server is refused for the rest of the run.
//! - CBC runs with an all-zero IV, as the wire format has no room for one.
//!   Equal plaintexts under the same session key produce equal ciphertexts.
//! - Session keys and the peer cache live in memory only.
//!
//! ## Modules
//!
//! - [`protocol`]: Wire codec (headers, fixed payloads, envelopes)
//! - [`crypto`]: RSA key handling, key wrapping, payload encryption
//! - [`transport`]: One connection per request/response exchange
//! - [`peers`]: In-memory peer cache with public and session keys
//! - [`dispatch`]: Inbound envelope handling and outbound envelope building
//! - [`client`]: Request orchestration
//! - [`identity`]: Persisted identity (`my.info`)
//! - [`blob`]: Storage for received files
//! - [`config`]: Client configuration and server address

/// Protocol version sent in every request header
pub const PROTOCOL_VERSION: u8 = 2;

pub mod blob;
pub mod client;
pub mod config;
pub mod crypto;
pub mod dispatch;
pub mod error;
pub mod identity;
pub mod peers;
pub mod protocol;
pub mod transport;

// Re-export commonly used types at the crate root
pub use blob::{BlobError, BlobSink, DirectorySink};
pub use client::{Client, PublicKeyLookup, SendReceipt};
pub use config::{ClientConfig, ConfigError, ServerAddress};
pub use crypto::{fingerprint, CryptoError, KeyPair, SymmetricKey};
pub use dispatch::{InboundOutcome, InboundReport};
pub use error::{ClientError, PreconditionError, ServerError};
pub use identity::{FileIdentityStore, Identity, IdentityError, IdentityStore};
pub use peers::{KeyCacheOutcome, PeerRecord, PeerStore};
pub use protocol::{ClientId, ProtocolError};
pub use transport::{TcpTransport, Transport, TransportError};
