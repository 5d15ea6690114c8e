//! Local identity and its persistence.
//!
//! The identity file (`my.info` by default) holds three parts:
//!
//! ```text
//! <username>
//! <client id, 32 hex chars>
//! <private key, Base64 PKCS#8 DER, possibly spread over several lines>
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::crypto::{CryptoError, KeyPair};
use crate::protocol::{ClientId, PublicKeyBytes};

/// Errors from loading or saving the identity.
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Malformed identity file {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("Invalid identity key: {0}")]
    Key(#[from] CryptoError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Who we are on the server.
#[derive(Clone, Debug)]
pub struct Identity {
    username: String,
    client_id: ClientId,
    keys: KeyPair,
}

impl Identity {
    pub fn new(username: impl Into<String>, client_id: ClientId, keys: KeyPair) -> Self {
        Self {
            username: username.into(),
            client_id,
            keys,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn keys(&self) -> &KeyPair {
        &self.keys
    }

    pub fn public_key_bytes(&self) -> &PublicKeyBytes {
        self.keys.public_key_bytes()
    }
}

/// Persistence for the local identity.
pub trait IdentityStore: Send {
    /// Returns `None` when no identity has been saved yet.
    fn load_identity(&self) -> Result<Option<Identity>, IdentityError>;

    fn save_identity(&mut self, identity: &Identity) -> Result<(), IdentityError>;
}

/// Identity stored in a `my.info` file.
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn malformed(&self, reason: impl Into<String>) -> IdentityError {
        IdentityError::Malformed {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }

    fn parse(&self, content: &str) -> Result<Identity, IdentityError> {
        let mut lines = content.lines();

        // Taken verbatim: the name must match what the server registered.
        let username = lines
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| self.malformed("missing username"))?;

        let id_line = lines.next().ok_or_else(|| self.malformed("missing client id"))?;
        let client_id = ClientId::from_hex(id_line)
            .map_err(|e| self.malformed(format!("bad client id: {}", e)))?;

        let key: String = lines.map(str::trim).collect();
        if key.is_empty() {
            return Err(self.malformed("missing private key"));
        }
        let keys = KeyPair::from_private_key_base64(&key)?;

        Ok(Identity::new(username, client_id, keys))
    }
}

impl IdentityStore for FileIdentityStore {
    fn load_identity(&self) -> Result<Option<Identity>, IdentityError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        self.parse(&content).map(Some)
    }

    fn save_identity(&mut self, identity: &Identity) -> Result<(), IdentityError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = format!(
            "{}\n{}\n{}\n",
            identity.username(),
            identity.client_id().to_hex(),
            identity.keys().private_key_base64()?
        );
        fs::write(&self.path, content)?;

        // Set restrictive permissions, the file holds the private key (Unix only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }
}
