#![forbid(unsafe_code)]

//! Cryptographic building blocks for the cloakfs config layer.
//!
//! - [`symmetric`]: authenticated encryption (AEAD) ciphers and the
//!   [`EncryptionKey`](symmetric::EncryptionKey) type that keeps key material
//!   in protected memory.
//! - [`kdf`]: password-based key derivation (scrypt).
//! - [`hash`]: salted one-way hashing, used to fingerprint encryption keys
//!   without storing them.

pub mod hash;
pub mod kdf;
pub mod symmetric;
