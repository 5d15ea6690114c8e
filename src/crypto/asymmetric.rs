//! Session key wrapping with RSA PKCS#1 v1.5.
//!
//! Only ever used to move a 16-byte AES key to a peer.

use rand::rngs::OsRng;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};

use super::{CryptoError, SymmetricKey};

/// Encrypts `key` for the holder of `public_key`.
pub fn wrap_key(public_key: &RsaPublicKey, key: &SymmetricKey) -> Result<Vec<u8>, CryptoError> {
    public_key
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, key.as_bytes())
        .map_err(|e| CryptoError::EncryptFailure(e.to_string()))
}

/// Recovers a session key wrapped for us.
pub fn unwrap_key(
    private_key: &RsaPrivateKey,
    ciphertext: &[u8],
) -> Result<SymmetricKey, CryptoError> {
    let plain = private_key
        .decrypt(Pkcs1v15Encrypt, ciphertext)
        .map_err(|e| CryptoError::DecryptFailure(e.to_string()))?;
    SymmetricKey::from_slice(&plain)
}
