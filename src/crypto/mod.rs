//! Cryptographic primitives for MessageU.
//!
//! This module provides:
//! - RSA-1024 key pairs and their wire/storage encodings
//! - Key wrapping with RSA PKCS#1 v1.5 (transport of AES session keys)
//! - Payload encryption with AES-128-CBC under a fixed zero IV
//!
//! The zero IV is part of the protocol. Under one session key, messages that
//! share a plaintext prefix share a ciphertext prefix; nothing here hides that.

pub mod asymmetric;
pub mod keys;
pub mod symmetric;

pub use asymmetric::{unwrap_key, wrap_key};
pub use keys::{decode_public_key, encode_public_key, fingerprint, KeyPair, RSA_KEY_BITS};
pub use symmetric::{
    decrypt_payload, encrypt_payload, generate_symmetric_key, SymmetricKey, SYMMETRIC_KEY_SIZE,
};

pub use rsa::{RsaPrivateKey, RsaPublicKey};

use thiserror::Error;

/// Errors from key handling and encryption.
///
/// All of these are per-message failures; none leave shared state modified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Malformed key material: {0}")]
    DecodeFailure(String),

    #[error("Decryption failed: {0}")]
    DecryptFailure(String),

    #[error("Encryption failed: {0}")]
    EncryptFailure(String),

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),
}
