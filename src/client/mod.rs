//! Request orchestration.
//!
//! [`Client`] turns user-level operations into single request/response
//! exchanges and applies their results to the peer store. An operation that
//! fails at the transport or with a server error leaves local state as it was.
//!
//! Peers are addressed by username. A name missing from the cache triggers
//! exactly one directory refresh before the peer is declared unknown.

mod exchange;

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::blob::BlobSink;
use crate::crypto::KeyPair;
use crate::dispatch::{build_outbound, dispatch_inbound, InboundReport, OutboundIntent};
use crate::error::{ClientError, PreconditionError};
use crate::identity::{Identity, IdentityStore};
use crate::peers::{KeyCacheOutcome, KeyDirectory, PeerStore};
use crate::protocol::{
    decode_client_list, decode_envelope_stream, encode_name, ClientId, ClientListEntry,
    MessageSentResponse, PublicKeyBytes, RegistrationRequest, RegistrationSuccess, RequestCode,
    ResponseCode,
};
use crate::transport::Transport;

use exchange::Exchange;

/// Confirmation that the server accepted a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendReceipt {
    pub recipient_id: ClientId,
    /// Server-assigned; not correlated with anything we pull later.
    pub message_id: u32,
}

/// A public key as returned by [`Client::fetch_public_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKeyLookup {
    pub peer_id: ClientId,
    /// The key in effect: the first one we ever cached for this peer.
    pub public_key: PublicKeyBytes,
    pub outcome: KeyCacheOutcome,
}

/// A MessageU client session.
pub struct Client<T, S, B> {
    transport: T,
    identity_store: S,
    sink: B,
    identity: Option<Identity>,
    peers: PeerStore,
}

impl<T, S, B> Client<T, S, B>
where
    T: Transport,
    S: IdentityStore,
    B: BlobSink,
{
    /// Creates a client, loading any saved identity from `identity_store`.
    pub fn new(transport: T, identity_store: S, sink: B) -> Result<Self, ClientError> {
        let identity = identity_store.load_identity()?;
        if let Some(identity) = &identity {
            debug!(user = identity.username(), id = %identity.client_id(), "loaded identity");
        }
        Ok(Self {
            transport,
            identity_store,
            sink,
            identity,
            peers: PeerStore::new(),
        })
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn peers(&self) -> &PeerStore {
        &self.peers
    }

    fn client_id(&self) -> Result<ClientId, PreconditionError> {
        self.identity
            .as_ref()
            .map(Identity::client_id)
            .ok_or(PreconditionError::NotRegistered)
    }

    /// Registers `username` with the server and persists the new identity.
    ///
    /// The identity is adopted only after it has been saved.
    pub async fn register(&mut self, username: &str) -> Result<&Identity, ClientError> {
        if let Some(identity) = &self.identity {
            return Err(PreconditionError::AlreadyRegistered(identity.username().to_string()).into());
        }
        encode_name(username).map_err(|e| PreconditionError::InvalidUsername(e.to_string()))?;
        // The identity file is line based.
        if username.contains(['\n', '\r']) {
            return Err(PreconditionError::InvalidUsername(
                "name contains a line break".to_string(),
            )
            .into());
        }

        let keys = KeyPair::generate()?;
        let payload = RegistrationRequest {
            name: username.to_string(),
            public_key: *keys.public_key_bytes(),
        }
        .encode()?;

        let body = Exchange::new(&mut self.transport, ClientId::default())
            .round_trip(
                RequestCode::Register,
                &payload,
                ResponseCode::RegistrationSuccess,
            )
            .await?;
        let assigned = RegistrationSuccess::decode(&body)?.client_id;

        let identity = Identity::new(username, assigned, keys);
        self.identity_store.save_identity(&identity)?;
        info!(user = username, id = %assigned, "registered");

        Ok(&*self.identity.insert(identity))
    }

    /// Fetches the directory and merges it into the peer store.
    ///
    /// Returns the listing, without our own entry.
    pub async fn refresh_clients(&mut self) -> Result<Vec<ClientListEntry>, ClientError> {
        let me = self.client_id()?;
        let body = Exchange::new(&mut self.transport, me)
            .round_trip(RequestCode::ClientsList, &[], ResponseCode::ClientsList)
            .await?;

        let mut entries = decode_client_list(&body)?;
        entries.retain(|e| e.client_id != me);
        self.peers.merge_directory(&entries);
        debug!(count = entries.len(), "directory refreshed");
        Ok(entries)
    }

    /// Asks the server for `name`'s public key.
    ///
    /// Always queries the server. A key that differs from one already cached
    /// is not adopted; the cached key is returned instead.
    pub async fn fetch_public_key(&mut self, name: &str) -> Result<PublicKeyLookup, ClientError> {
        let me = self.client_id()?;
        let peer_id = self.resolve_peer(name).await?;

        let fetched = Exchange::new(&mut self.transport, me)
            .fetch_public_key(&peer_id)
            .await?;
        let outcome = self.peers.cache_public_key(peer_id, fetched);
        let public_key = self
            .peers
            .lookup(&peer_id)
            .and_then(|p| p.public_key)
            .unwrap_or(fetched);

        Ok(PublicKeyLookup {
            peer_id,
            public_key,
            outcome,
        })
    }

    /// Pulls and handles every waiting message, in server order.
    ///
    /// Per-message failures are reported in the returned list and do not
    /// stop the batch.
    pub async fn pull_messages(&mut self) -> Result<Vec<InboundReport>, ClientError> {
        let me = self.client_id()?;
        let body = Exchange::new(&mut self.transport, me)
            .round_trip(RequestCode::PullMessages, &[], ResponseCode::PullMessages)
            .await?;

        let mut reports = Vec::new();
        let mut refreshed_for = HashSet::new();
        for item in decode_envelope_stream(&body) {
            let envelope = match item {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!(error = %e, "undecodable message");
                    reports.push(InboundReport::from_stream_error(e, &self.peers));
                    continue;
                }
            };

            if self.peers.lookup(&envelope.sender_id).is_none()
                && refreshed_for.insert(envelope.sender_id)
            {
                self.resolve_sender().await;
            }

            let Some(identity) = self.identity.as_ref() else {
                return Err(PreconditionError::NotRegistered.into());
            };
            reports.push(dispatch_inbound(
                envelope,
                identity.keys().private_key(),
                &mut self.peers,
                &mut self.sink,
            ));
        }

        debug!(count = reports.len(), "messages pulled");
        Ok(reports)
    }

    /// Sends a text message to `name`. Needs an established session key.
    pub async fn send_text(&mut self, name: &str, text: &str) -> Result<SendReceipt, ClientError> {
        self.send(name, OutboundIntent::Text(text.to_string())).await
    }

    /// Asks `name` to send us a session key.
    pub async fn request_symmetric_key(&mut self, name: &str) -> Result<SendReceipt, ClientError> {
        self.send(name, OutboundIntent::KeyRequest).await
    }

    /// Generates a new session key and sends it to `name`.
    ///
    /// Fetches `name`'s public key first if it isn't cached. The new key
    /// replaces any previous one only after the server accepts the message.
    pub async fn send_symmetric_key(&mut self, name: &str) -> Result<SendReceipt, ClientError> {
        self.send(name, OutboundIntent::KeySend).await
    }

    /// Sends file contents to `name`. Needs an established session key.
    pub async fn send_file(
        &mut self,
        name: &str,
        contents: Vec<u8>,
    ) -> Result<SendReceipt, ClientError> {
        self.send(name, OutboundIntent::File(contents)).await
    }

    async fn send(&mut self, name: &str, intent: OutboundIntent) -> Result<SendReceipt, ClientError> {
        let me = self.client_id()?;
        let peer_id = self.resolve_peer(name).await?;

        if intent == OutboundIntent::KeySend {
            let mut directory = Exchange::new(&mut self.transport, me);
            self.peers.ensure_public_key(&peer_id, &mut directory).await?;
        }

        let record = self
            .peers
            .lookup(&peer_id)
            .ok_or_else(|| PreconditionError::UnknownPeer(name.to_string()))?;
        let message = build_outbound(intent, record)?;
        let payload = message.envelope.encode()?;

        let body = Exchange::new(&mut self.transport, me)
            .round_trip(RequestCode::SendMessage, &payload, ResponseCode::MessageSent)
            .await?;
        let sent = MessageSentResponse::decode(&body)?;
        if sent.client_id != peer_id {
            return Err(ClientError::peer_mismatch(peer_id, sent.client_id));
        }

        if let Some(key) = message.pending_key {
            self.peers.set_symmetric_key(peer_id, key);
            info!(peer = %peer_id, peer_name = name, "session key sent");
        }

        Ok(SendReceipt {
            recipient_id: peer_id,
            message_id: sent.message_id,
        })
    }

    /// Finds `name` in the cache, refreshing the directory once on a miss.
    async fn resolve_peer(&mut self, name: &str) -> Result<ClientId, ClientError> {
        if let Some(peer) = self.peers.lookup_by_name(name) {
            return Ok(peer.peer_id);
        }
        debug!(peer_name = name, "not cached, refreshing directory");
        self.refresh_clients().await?;
        self.peers
            .lookup_by_name(name)
            .map(|p| p.peer_id)
            .ok_or_else(|| PreconditionError::UnknownPeer(name.to_string()).into())
    }

    /// Refreshes the directory for an unknown sender. A failed refresh is
    /// logged and the message is still handled.
    async fn resolve_sender(&mut self) {
        if let Err(e) = self.refresh_clients().await {
            warn!(error = %e, "directory refresh for unknown sender failed");
        }
    }
}
