//! RSA key pairs and their encodings.
//!
//! Public keys travel in a fixed 160-byte field holding the X.509
//! SubjectPublicKeyInfo DER. With a 1024-bit modulus and public exponent 17
//! that DER is exactly 160 bytes. Private keys are stored as Base64 PKCS#8 DER.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

use super::CryptoError;
use crate::protocol::{PublicKeyBytes, PUBLIC_KEY_SIZE};

/// Modulus size of generated keys.
pub const RSA_KEY_BITS: usize = 1024;

/// Public exponent of generated keys.
const RSA_PUBLIC_EXPONENT: u32 = 17;

/// A local RSA key pair.
#[derive(Clone)]
pub struct KeyPair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
    encoded_public: PublicKeyBytes,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("fingerprint", &fingerprint(&self.encoded_public))
            .field("private", &"[REDACTED]")
            .finish()
    }
}

impl KeyPair {
    /// Generates a new random 1024-bit key pair.
    pub fn generate() -> Result<Self, CryptoError> {
        let exponent = BigUint::from(RSA_PUBLIC_EXPONENT);
        let private = RsaPrivateKey::new_with_exp(&mut OsRng, RSA_KEY_BITS, &exponent)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        Self::from_private_key(private)
    }

    /// Builds a key pair around an existing private key.
    pub fn from_private_key(private: RsaPrivateKey) -> Result<Self, CryptoError> {
        let public = RsaPublicKey::from(&private);
        let encoded_public = encode_public_key(&public)?;
        Ok(Self {
            private,
            public,
            encoded_public,
        })
    }

    /// Restores a key pair from Base64 PKCS#8 DER.
    pub fn from_private_key_base64(encoded: &str) -> Result<Self, CryptoError> {
        let compact: String = encoded.split_whitespace().collect();
        let der = BASE64
            .decode(compact.as_bytes())
            .map_err(|e| CryptoError::DecodeFailure(format!("private key base64: {}", e)))?;
        let private = RsaPrivateKey::from_pkcs8_der(&der)
            .map_err(|e| CryptoError::DecodeFailure(format!("private key DER: {}", e)))?;
        Self::from_private_key(private)
    }

    /// Encodes the private key as Base64 PKCS#8 DER.
    pub fn private_key_base64(&self) -> Result<String, CryptoError> {
        let der = self
            .private
            .to_pkcs8_der()
            .map_err(|e| CryptoError::DecodeFailure(format!("private key DER: {}", e)))?;
        Ok(BASE64.encode(der.as_bytes()))
    }

    /// Returns the private key.
    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }

    /// Returns the public key.
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// Returns the public key as carried on the wire.
    pub fn public_key_bytes(&self) -> &PublicKeyBytes {
        &self.encoded_public
    }
}

/// Encodes a public key into the fixed 160-byte field, zero-padding short DER.
pub fn encode_public_key(key: &RsaPublicKey) -> Result<PublicKeyBytes, CryptoError> {
    let der = key
        .to_public_key_der()
        .map_err(|e| CryptoError::KeyGeneration(format!("public key DER: {}", e)))?;
    let der = der.as_bytes();
    if der.len() > PUBLIC_KEY_SIZE {
        return Err(CryptoError::KeyGeneration(format!(
            "public key DER is {} bytes, field holds {}",
            der.len(),
            PUBLIC_KEY_SIZE
        )));
    }
    let mut field = [0u8; PUBLIC_KEY_SIZE];
    field[..der.len()].copy_from_slice(der);
    Ok(field)
}

/// Decodes a public key from the fixed 160-byte field.
pub fn decode_public_key(field: &PublicKeyBytes) -> Result<RsaPublicKey, CryptoError> {
    let len = der_length(field)?;
    RsaPublicKey::from_public_key_der(&field[..len])
        .map_err(|e| CryptoError::DecodeFailure(format!("public key DER: {}", e)))
}

/// Total length of the DER SEQUENCE at the start of `bytes`, header included.
fn der_length(bytes: &[u8]) -> Result<usize, CryptoError> {
    let malformed = |what: &str| CryptoError::DecodeFailure(format!("public key DER: {}", what));

    if bytes.len() < 2 || bytes[0] != 0x30 {
        return Err(malformed("not a SEQUENCE"));
    }
    let first = bytes[1] as usize;
    let (header, body) = if first < 0x80 {
        (2, first)
    } else {
        let count = first & 0x7F;
        if count == 0 || count > 2 || bytes.len() < 2 + count {
            return Err(malformed("bad length prefix"));
        }
        let body = bytes[2..2 + count]
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | b as usize);
        (2 + count, body)
    };

    let total = header + body;
    if total > bytes.len() {
        return Err(malformed("length exceeds field"));
    }
    Ok(total)
}

/// SHA-256 fingerprint of a public key field, as lower-case hex.
pub fn fingerprint(field: &PublicKeyBytes) -> String {
    hex::encode(Sha256::digest(field))
}

#[cfg(test)]
pub(crate) fn test_keypair() -> &'static KeyPair {
    static PAIR: std::sync::OnceLock<KeyPair> = std::sync::OnceLock::new();
    PAIR.get_or_init(|| KeyPair::generate().unwrap())
}

#[cfg(test)]
pub(crate) fn other_test_keypair() -> &'static KeyPair {
    static PAIR: std::sync::OnceLock<KeyPair> = std::sync::OnceLock::new();
    PAIR.get_or_init(|| KeyPair::generate().unwrap())
}
