//! AES-128-CBC payload encryption.
//!
//! PKCS#7 padding, all-zero IV. The IV is fixed by the protocol; both ends
//! must use it to interoperate.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::CryptoError;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// Size of a session key in bytes.
pub const SYMMETRIC_KEY_SIZE: usize = 16;

const ZERO_IV: [u8; 16] = [0u8; 16];

/// A 128-bit AES session key shared with one peer. Wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; SYMMETRIC_KEY_SIZE]);

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey([REDACTED])")
    }
}

impl SymmetricKey {
    pub fn new(bytes: [u8; SYMMETRIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Accepts exactly 16 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; SYMMETRIC_KEY_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::DecryptFailure(format!(
                "session key is {} bytes, expected {}",
                bytes.len(),
                SYMMETRIC_KEY_SIZE
            ))
        })?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_SIZE] {
        &self.0
    }
}

/// Generates a fresh random session key.
pub fn generate_symmetric_key() -> SymmetricKey {
    let mut bytes = [0u8; SYMMETRIC_KEY_SIZE];
    OsRng.fill_bytes(&mut bytes);
    let key = SymmetricKey(bytes);
    bytes.zeroize();
    key
}

/// Encrypts `plaintext` under `key`.
pub fn encrypt_payload(key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes128CbcEnc::new_from_slices(key.as_bytes(), &ZERO_IV)
        .map_err(|e| CryptoError::EncryptFailure(e.to_string()))?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

/// Decrypts `ciphertext` under `key`, checking the padding.
pub fn decrypt_payload(key: &SymmetricKey, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
        return Err(CryptoError::DecryptFailure(format!(
            "ciphertext length {} is not a positive multiple of the block size",
            ciphertext.len()
        )));
    }
    let cipher = Aes128CbcDec::new_from_slices(key.as_bytes(), &ZERO_IV)
        .map_err(|e| CryptoError::DecryptFailure(e.to_string()))?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::DecryptFailure("bad padding".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_roundtrip() {
        let key = generate_symmetric_key();
        let cases: [&[u8]; 4] = [b"", b"hi", &[7u8; 16], &[9u8; 1000]];
        for plaintext in cases {
            let ciphertext = encrypt_payload(&key, plaintext).unwrap();
            assert_eq!(ciphertext.len() % 16, 0);
            assert!(ciphertext.len() > plaintext.len());
            assert_eq!(decrypt_payload(&key, &ciphertext).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_zero_iv_is_deterministic() {
        let key = SymmetricKey::new([3u8; 16]);
        let a = encrypt_payload(&key, b"same text").unwrap();
        let b = encrypt_payload(&key, b"same text").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_known_vector() {
        // AES-128 of one zero block under a zero key is 66e94bd4ef8a2c3b884cfa59ca342b2e;
        // with a zero IV that is also the first CBC block.
        let key = SymmetricKey::new([0u8; 16]);
        let ciphertext = encrypt_payload(&key, &[0u8; 16]).unwrap();
        assert_eq!(
            hex::encode(&ciphertext[..16]),
            "66e94bd4ef8a2c3b884cfa59ca342b2e"
        );
    }

    #[test]
    fn test_wrong_key_fails_or_garbles() {
        let a = generate_symmetric_key();
        let b = generate_symmetric_key();
        let ciphertext = encrypt_payload(&a, b"secret message").unwrap();
        match decrypt_payload(&b, &ciphertext) {
            Ok(plain) => assert_ne!(plain, b"secret message"),
            Err(e) => assert!(matches!(e, CryptoError::DecryptFailure(_))),
        }
    }

    #[test]
    fn test_bad_ciphertext_length() {
        let key = generate_symmetric_key();
        assert!(decrypt_payload(&key, &[]).is_err());
        assert!(decrypt_payload(&key, &[0u8; 15]).is_err());
    }

    #[test]
    fn test_key_from_slice() {
        assert!(SymmetricKey::from_slice(&[1u8; 16]).is_ok());
        assert!(SymmetricKey::from_slice(&[1u8; 15]).is_err());
        assert!(SymmetricKey::from_slice(&[1u8; 32]).is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = SymmetricKey::new([0xAB; 16]);
        assert!(!format!("{:?}", key).contains("ab"));
        assert!(!format!("{:?}", key).contains("171"));
    }
}
