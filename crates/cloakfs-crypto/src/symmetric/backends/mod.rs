//! Backend implementations for symmetric ciphers.
//!
//! Only the pure Rust `aead` crate ecosystem is supported. This keeps the
//! build free of C toolchain requirements, which is all the config layer
//! needs; it only ever encrypts a few kilobytes at a time.

pub mod aead;
