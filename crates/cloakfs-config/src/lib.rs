#![forbid(unsafe_code)]

//! Configuration core of cloakfs.
//!
//! cloakfs persists every byte of a mounted filesystem to an untrusted
//! directory as authenticated ciphertext blocks. This crate owns the part
//! that gates access to such a filesystem: the encrypted config descriptor
//! (`cryfs.config`-format envelope carrying the inner encryption key), the
//! credential-to-key derivation that decrypts it, and the per-machine local
//! state that detects a filesystem being replaced by an adversary.
//!
//! The main entry point is [`config::load_or_create`].

pub mod config;
pub mod localstate;

mod error;
mod utils;

pub use config::ALL_CIPHERS;
pub use error::ErrorCode;
