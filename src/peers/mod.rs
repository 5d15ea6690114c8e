//! Peer key store.
//!
//! An in-memory cache of every client we know about, keyed by client id. Each
//! record may carry the peer's public key and the session key we share with
//! it. The cache lives for one process run and is rebuilt from the server.
//!
//! Public keys follow trust on first use: the first key cached for a peer is
//! kept for the rest of the run. Session keys change only through a key
//! exchange.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::warn;

use crate::crypto::SymmetricKey;
use crate::error::{ClientError, PreconditionError};
use crate::protocol::{ClientId, ClientListEntry, PublicKeyBytes};

/// Shown in place of a peer whose name we don't know.
pub const UNKNOWN_PEER_NAME: &str = "Unknown";

/// Everything we know about one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRecord {
    pub peer_id: ClientId,
    /// Empty when the peer has only been seen as a message sender.
    pub username: String,
    pub public_key: Option<PublicKeyBytes>,
    pub symmetric_key: Option<SymmetricKey>,
}

impl PeerRecord {
    pub fn new(peer_id: ClientId, username: impl Into<String>) -> Self {
        Self {
            peer_id,
            username: username.into(),
            public_key: None,
            symmetric_key: None,
        }
    }

    /// The username, or "Unknown" when we never learned it.
    pub fn display_name(&self) -> &str {
        if self.username.is_empty() {
            UNKNOWN_PEER_NAME
        } else {
            &self.username
        }
    }
}

/// Result of offering a public key to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCacheOutcome {
    /// No key was cached; this one now is.
    Cached,
    /// The same key was already cached.
    AlreadyKnown,
    /// A different key is cached; it was kept and the offered one dropped.
    Conflict,
}

/// Source of public keys, normally the server.
#[async_trait]
pub trait KeyDirectory: Send {
    async fn fetch_public_key(&mut self, peer_id: &ClientId) -> Result<PublicKeyBytes, ClientError>;
}

/// In-memory cache of peers.
#[derive(Debug, Default)]
pub struct PeerStore {
    peers: HashMap<ClientId, PeerRecord>,
}

impl PeerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, peer_id: &ClientId) -> Option<&PeerRecord> {
        self.peers.get(peer_id)
    }

    /// Finds a peer by exact username. At most one peer holds a given name.
    pub fn lookup_by_name(&self, name: &str) -> Option<&PeerRecord> {
        if name.is_empty() {
            return None;
        }
        self.peers.values().find(|p| p.username == name)
    }

    /// Merges `record` into the cache.
    ///
    /// A non-empty username replaces the cached one and is taken away from
    /// any other peer holding it, so a name always resolves to the peer it
    /// was most recently seen with. A public key is only taken if none is
    /// cached. A session key replaces the cached one.
    pub fn upsert(&mut self, record: PeerRecord) {
        let PeerRecord {
            peer_id,
            username,
            public_key,
            symmetric_key,
        } = record;

        if !username.is_empty() {
            for other in self.peers.values_mut() {
                if other.peer_id != peer_id && other.username == username {
                    other.username.clear();
                }
            }
        }

        let entry = self.entry(peer_id);
        if !username.is_empty() {
            entry.username = username;
        }
        if entry.public_key.is_none() {
            entry.public_key = public_key;
        }
        if symmetric_key.is_some() {
            entry.symmetric_key = symmetric_key;
        }
    }

    /// Applies a directory listing: names are added or updated, keys kept.
    pub fn merge_directory(&mut self, entries: &[ClientListEntry]) {
        for entry in entries {
            self.upsert(PeerRecord::new(entry.client_id, entry.name.clone()));
        }
    }

    /// Offers a public key for `peer_id`, keeping any key already cached.
    pub fn cache_public_key(&mut self, peer_id: ClientId, key: PublicKeyBytes) -> KeyCacheOutcome {
        let entry = self.entry(peer_id);
        match entry.public_key {
            None => {
                entry.public_key = Some(key);
                KeyCacheOutcome::Cached
            }
            Some(cached) if cached == key => KeyCacheOutcome::AlreadyKnown,
            Some(_) => {
                warn!(
                    peer = %peer_id,
                    peer_name = entry.display_name(),
                    "server returned a different public key; keeping the first one"
                );
                KeyCacheOutcome::Conflict
            }
        }
    }

    /// Stores the session key shared with `peer_id`, creating the record if needed.
    pub fn set_symmetric_key(&mut self, peer_id: ClientId, key: SymmetricKey) {
        self.entry(peer_id).symmetric_key = Some(key);
    }

    /// Returns the public key for `peer_id`, fetching it through `directory`
    /// when none is cached.
    pub async fn ensure_public_key<D: KeyDirectory + ?Sized>(
        &mut self,
        peer_id: &ClientId,
        directory: &mut D,
    ) -> Result<PublicKeyBytes, ClientError> {
        if let Some(key) = self.lookup(peer_id).and_then(|p| p.public_key) {
            return Ok(key);
        }
        let fetched = directory.fetch_public_key(peer_id).await?;
        self.cache_public_key(*peer_id, fetched);
        Ok(fetched)
    }

    /// Returns the session key shared with `peer_id`. Never touches the network.
    pub fn ensure_symmetric_key(
        &self,
        peer_id: &ClientId,
    ) -> Result<&SymmetricKey, PreconditionError> {
        let record = self.lookup(peer_id);
        record
            .and_then(|p| p.symmetric_key.as_ref())
            .ok_or_else(|| {
                PreconditionError::MissingSymmetricKey(
                    record
                        .map(|p| p.display_name().to_string())
                        .unwrap_or_else(|| peer_id.to_hex()),
                )
            })
    }

    /// All peers, sorted by name then id.
    pub fn iter(&self) -> impl Iterator<Item = &PeerRecord> {
        let mut peers: Vec<&PeerRecord> = self.peers.values().collect();
        peers.sort_by(|a, b| {
            a.username
                .cmp(&b.username)
                .then_with(|| a.peer_id.cmp(&b.peer_id))
        });
        peers.into_iter()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    fn entry(&mut self, peer_id: ClientId) -> &mut PeerRecord {
        self.peers
            .entry(peer_id)
            .or_insert_with(|| PeerRecord::new(peer_id, ""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_symmetric_key;
    use crate::protocol::PUBLIC_KEY_SIZE;

    struct CountingDirectory {
        key: PublicKeyBytes,
        calls: usize,
        fail: bool,
    }

    #[async_trait]
    impl KeyDirectory for CountingDirectory {
        async fn fetch_public_key(
            &mut self,
            _peer_id: &ClientId,
        ) -> Result<PublicKeyBytes, ClientError> {
            self.calls += 1;
            if self.fail {
                return Err(crate::error::ServerError::GeneralError.into());
            }
            Ok(self.key)
        }
    }

    fn id(n: u8) -> ClientId {
        ClientId::new([n; 16])
    }

    #[test]
    fn test_display_name() {
        assert_eq!(PeerRecord::new(id(1), "").display_name(), "Unknown");
        assert_eq!(PeerRecord::new(id(1), "bob").display_name(), "bob");
    }

    #[test]
    fn test_merge_directory_keeps_keys() {
        let mut store = PeerStore::new();
        store.set_symmetric_key(id(1), generate_symmetric_key());
        store.cache_public_key(id(1), [7; PUBLIC_KEY_SIZE]);

        store.merge_directory(&[
            ClientListEntry {
                client_id: id(1),
                name: "bob".to_string(),
            },
            ClientListEntry {
                client_id: id(2),
                name: "carol".to_string(),
            },
        ]);

        assert_eq!(store.len(), 2);
        let bob = store.lookup_by_name("bob").unwrap();
        assert_eq!(bob.peer_id, id(1));
        assert!(bob.symmetric_key.is_some());
        assert_eq!(bob.public_key, Some([7; PUBLIC_KEY_SIZE]));
        assert!(store.lookup_by_name("carol").unwrap().public_key.is_none());
        assert!(store.lookup_by_name("dave").is_none());
        assert!(store.lookup_by_name("").is_none());
    }

    #[test]
    fn test_reused_name_resolves_to_latest_peer() {
        let mut store = PeerStore::new();
        let bob = |peer: ClientId| ClientListEntry {
            client_id: peer,
            name: "bob".to_string(),
        };
        store.cache_public_key(id(1), [1; PUBLIC_KEY_SIZE]);
        store.merge_directory(&[bob(id(1))]);
        store.merge_directory(&[bob(id(2))]);

        assert_eq!(store.lookup_by_name("bob").unwrap().peer_id, id(2));
        let old = store.lookup(&id(1)).unwrap();
        assert_eq!(old.display_name(), "Unknown");
        assert_eq!(old.public_key, Some([1; PUBLIC_KEY_SIZE]));

        // Within one listing the later entry wins.
        store.merge_directory(&[bob(id(3)), bob(id(4))]);
        assert_eq!(store.lookup_by_name("bob").unwrap().peer_id, id(4));
        let holders = store.iter().filter(|p| p.username == "bob").count();
        assert_eq!(holders, 1);
    }

    #[test]
    fn test_public_key_trust_on_first_use() {
        let mut store = PeerStore::new();
        assert_eq!(
            store.cache_public_key(id(1), [1; PUBLIC_KEY_SIZE]),
            KeyCacheOutcome::Cached
        );
        assert_eq!(
            store.cache_public_key(id(1), [1; PUBLIC_KEY_SIZE]),
            KeyCacheOutcome::AlreadyKnown
        );
        assert_eq!(
            store.cache_public_key(id(1), [2; PUBLIC_KEY_SIZE]),
            KeyCacheOutcome::Conflict
        );
        assert_eq!(
            store.lookup(&id(1)).unwrap().public_key,
            Some([1; PUBLIC_KEY_SIZE])
        );
    }

    #[test]
    fn test_upsert_merges_fields() {
        let mut store = PeerStore::new();
        let mut record = PeerRecord::new(id(1), "bob");
        record.public_key = Some([1; PUBLIC_KEY_SIZE]);
        store.upsert(record);

        let mut update = PeerRecord::new(id(1), "");
        update.public_key = Some([2; PUBLIC_KEY_SIZE]);
        let key = generate_symmetric_key();
        update.symmetric_key = Some(key.clone());
        store.upsert(update);

        let stored = store.lookup(&id(1)).unwrap();
        assert_eq!(stored.username, "bob");
        assert_eq!(stored.public_key, Some([1; PUBLIC_KEY_SIZE]));
        assert_eq!(stored.symmetric_key, Some(key));
    }

    #[test]
    fn test_symmetric_key_replaced_by_exchange() {
        let mut store = PeerStore::new();
        let first = generate_symmetric_key();
        let second = generate_symmetric_key();
        store.set_symmetric_key(id(1), first);
        store.set_symmetric_key(id(1), second.clone());
        assert_eq!(store.ensure_symmetric_key(&id(1)).unwrap(), &second);
    }

    #[test]
    fn test_ensure_symmetric_key_missing() {
        let mut store = PeerStore::new();
        store.upsert(PeerRecord::new(id(1), "bob"));

        assert_eq!(
            store.ensure_symmetric_key(&id(1)).unwrap_err(),
            PreconditionError::MissingSymmetricKey("bob".to_string())
        );
        assert_eq!(
            store.ensure_symmetric_key(&id(9)).unwrap_err(),
            PreconditionError::MissingSymmetricKey(id(9).to_hex())
        );
    }

    #[test]
    fn test_iter_sorted_by_name() {
        let mut store = PeerStore::new();
        store.upsert(PeerRecord::new(id(3), "zed"));
        store.upsert(PeerRecord::new(id(1), "amy"));
        store.upsert(PeerRecord::new(id(2), "kim"));

        let names: Vec<&str> = store.iter().map(|p| p.username.as_str()).collect();
        assert_eq!(names, vec!["amy", "kim", "zed"]);
    }

    #[tokio::test]
    async fn test_ensure_public_key_fetches_once() {
        let mut store = PeerStore::new();
        let mut directory = CountingDirectory {
            key: [4; PUBLIC_KEY_SIZE],
            calls: 0,
            fail: false,
        };

        let first = store.ensure_public_key(&id(1), &mut directory).await.unwrap();
        let second = store.ensure_public_key(&id(1), &mut directory).await.unwrap();

        assert_eq!(first, [4; PUBLIC_KEY_SIZE]);
        assert_eq!(second, first);
        assert_eq!(directory.calls, 1);
    }

    #[tokio::test]
    async fn test_ensure_public_key_propagates_failure() {
        let mut store = PeerStore::new();
        let mut directory = CountingDirectory {
            key: [4; PUBLIC_KEY_SIZE],
            calls: 0,
            fail: true,
        };

        assert!(store.ensure_public_key(&id(1), &mut directory).await.is_err());
        assert!(store.lookup(&id(1)).is_none());
    }
}
