//! Symmetric authenticated encryption (AEAD).
//!
//! All ciphers in this module provide both confidentiality and integrity
//! protection and accept associated data that is authenticated but not
//! encrypted. Ciphertext is laid out as `[nonce][encrypted_data][auth_tag]`,
//! with a fresh random nonce per encryption.

use anyhow::Result;
use derive_more::{Display, Error};

/// A symmetric cipher providing authenticated encryption with associated data.
///
/// Decryption verifies the authentication tag over both the ciphertext and
/// the associated data; any tampering makes it fail.
pub trait Cipher {
    /// Encrypts `plaintext`, authenticating `associated_data` alongside it.
    /// Returns `[nonce][encrypted_data][auth_tag]`.
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>>;

    /// Decrypts ciphertext produced by [`Cipher::encrypt`].
    ///
    /// Fails if the ciphertext is too small to contain nonce and tag, if the
    /// key is wrong, or if the ciphertext or associated data were tampered
    /// with. The error deliberately doesn't distinguish these causes.
    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>>;

    /// Number of prefix bytes added to ciphertext (the nonce size).
    fn ciphertext_overhead_prefix(&self) -> usize;

    /// Number of suffix bytes added to ciphertext (the auth tag size).
    fn ciphertext_overhead_suffix(&self) -> usize;
}

/// Error returned when creating a cipher with a key of the wrong size.
#[derive(Error, Display, Debug)]
#[display("Expected key size of {expected} bytes, but got {got} bytes")]
pub struct InvalidKeySizeError {
    pub expected: usize,
    pub got: usize,
}

/// A [`Cipher`] with compile-time constants for key size and ciphertext
/// overhead, enabling type-safe cipher selection by name.
pub trait CipherDef: Cipher + Sized {
    /// Creates a cipher instance. The key must be exactly `KEY_SIZE` bytes.
    fn new(key: EncryptionKey) -> Result<Self, InvalidKeySizeError>;

    const KEY_SIZE: usize;
    const CIPHERTEXT_OVERHEAD_PREFIX: usize;
    const CIPHERTEXT_OVERHEAD_SUFFIX: usize;
}

mod backends;
mod key;

#[cfg(test)]
mod cipher_tests;

pub use key::EncryptionKey;

mod aesgcm;
pub use aesgcm::{Aes128Gcm, Aes256Gcm};
mod xchacha20poly1305;
pub use xchacha20poly1305::XChaCha20Poly1305;
