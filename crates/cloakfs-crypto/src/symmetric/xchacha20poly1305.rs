//! XChaCha20-Poly1305 authenticated encryption.
//!
//! The "X" variant uses a 192-bit (24 byte) nonce, which is large enough to be
//! safely generated randomly without risk of collision. This is the cipher
//! used for the config descriptor envelope.
//!
//! - Key size: 32 bytes (256 bits)
//! - Nonce size: 24 bytes (192 bits)
//! - Auth tag size: 16 bytes (128 bits)

/// XChaCha20-Poly1305 using the pure Rust `chacha20poly1305` crate.
pub type XChaCha20Poly1305 =
    super::backends::aead::AeadCipher<chacha20poly1305::XChaCha20Poly1305>;
