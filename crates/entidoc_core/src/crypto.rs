//! Authenticated encryption for binary payloads.
//!
//! Used by the image codec to transform recognized image payloads before
//! they reach the store.
//!
//! ## Security Model
//!
//! - AES-256-GCM authenticated encryption
//! - Unique random nonce per encryption
//! - Keys are zeroized on drop
//! - Keys can be derived from a shared secret with HKDF-SHA256

use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CoreError, CoreResult};

/// Size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of the GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Encryption key for AES-256-GCM.
///
/// The key is zeroized when dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    bytes: [u8; KEY_SIZE],
}

impl EncryptionKey {
    /// Generates a new random key.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the slice is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CoreError::invalid_key_size(bytes.len(), KEY_SIZE));
        }
        let mut key_bytes = [0u8; KEY_SIZE];
        key_bytes.copy_from_slice(bytes);
        Ok(Self { bytes: key_bytes })
    }

    /// Derives a key from a shared secret using HKDF-SHA256.
    ///
    /// The same secret always yields the same key, so every process sharing
    /// the secret can reverse payloads written by the others.
    ///
    /// # Errors
    ///
    /// Returns an error if HKDF expansion fails.
    pub fn derive_from_secret(secret: &[u8]) -> CoreResult<Self> {
        let hk = Hkdf::<Sha256>::new(Some(b"entidoc-binary-transform"), secret);
        let mut bytes = [0u8; KEY_SIZE];
        hk.expand(b"entidoc-image-key-v1", &mut bytes)
            .map_err(|_| CoreError::key_derivation_failed("HKDF expand failed"))?;
        Ok(Self { bytes })
    }

    /// Returns the key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Encrypts and decrypts payloads with one key.
pub struct CryptoManager {
    cipher: Aes256Gcm,
}

impl CryptoManager {
    /// Creates a manager for the given key.
    #[must_use]
    pub fn new(key: &EncryptionKey) -> Self {
        let cipher = Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()));
        Self { cipher }
    }

    /// Encrypts data.
    ///
    /// The output format is: `nonce (12 bytes) || ciphertext || tag (16 bytes)`
    ///
    /// # Errors
    ///
    /// Returns an error if the cipher rejects the input.
    pub fn encrypt(&self, plaintext: &[u8]) -> CoreResult<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CoreError::encryption_failed("encryption error"))?;

        let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend(ciphertext);
        Ok(result)
    }

    /// Decrypts data produced by [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// Returns an error on a wrong key, truncated or tampered data.
    pub fn decrypt(&self, ciphertext: &[u8]) -> CoreResult<Vec<u8>> {
        if ciphertext.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CoreError::decryption_failed("ciphertext too short"));
        }
        let (nonce, encrypted) = ciphertext.split_at(NONCE_SIZE);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), encrypted)
            .map_err(|_| CoreError::decryption_failed("authentication failed"))
    }
}

impl std::fmt::Debug for CryptoManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoManager").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt() {
        let manager = CryptoManager::new(&EncryptionKey::generate());
        let ciphertext = manager.encrypt(b"payload").unwrap();
        assert_eq!(ciphertext.len(), NONCE_SIZE + 7 + TAG_SIZE);
        assert_eq!(manager.decrypt(&ciphertext).unwrap(), b"payload");
    }

    #[test]
    fn nonces_differ() {
        let manager = CryptoManager::new(&EncryptionKey::generate());
        assert_ne!(manager.encrypt(b"x").unwrap(), manager.encrypt(b"x").unwrap());
    }

    #[test]
    fn wrong_key_fails() {
        let ciphertext = CryptoManager::new(&EncryptionKey::generate())
            .encrypt(b"secret")
            .unwrap();
        let other = CryptoManager::new(&EncryptionKey::generate());
        assert!(matches!(
            other.decrypt(&ciphertext),
            Err(CoreError::DecryptionFailed { .. })
        ));
    }

    #[test]
    fn truncated_ciphertext_fails() {
        let manager = CryptoManager::new(&EncryptionKey::generate());
        assert!(manager.decrypt(&[0u8; 10]).is_err());
    }

    #[test]
    fn key_size_checked() {
        assert!(matches!(
            EncryptionKey::from_bytes(&[0u8; 16]),
            Err(CoreError::InvalidKeySize {
                expected: 32,
                actual: 16
            })
        ));
        assert!(EncryptionKey::from_bytes(&[0u8; 32]).is_ok());
    }

    #[test]
    fn derived_keys_are_stable() {
        let a = EncryptionKey::derive_from_secret(b"shared").unwrap();
        let b = EncryptionKey::derive_from_secret(b"shared").unwrap();
        let c = EncryptionKey::derive_from_secret(b"other").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn debug_redacts_key() {
        let rendered = format!("{:?}", EncryptionKey::generate());
        assert!(rendered.contains("REDACTED"));
    }
}
