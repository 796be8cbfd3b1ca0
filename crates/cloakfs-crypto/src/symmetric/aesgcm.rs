//! AES-GCM authenticated encryption.
//!
//! - Key size: 32 bytes (AES-256) or 16 bytes (AES-128)
//! - Nonce size: 12 bytes
//! - Auth tag size: 16 bytes

/// AES-256-GCM using the pure Rust `aes-gcm` crate.
pub type Aes256Gcm = super::backends::aead::AeadCipher<aes_gcm::Aes256Gcm>;

/// AES-128-GCM using the pure Rust `aes-gcm` crate.
pub type Aes128Gcm = super::backends::aead::AeadCipher<aes_gcm::Aes128Gcm>;
