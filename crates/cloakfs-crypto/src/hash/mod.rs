//! Salted one-way hashing.
//!
//! Used to store a fingerprint of an encryption key in local state without
//! storing the key itself: `hash(salt || key)` with a random salt. The salt
//! is stored next to the digest so the fingerprint can be re-checked later.

mod digest;
mod hash;
mod hasher;
mod salt;

pub use digest::Digest;
pub use hash::Hash;
pub use hasher::hash;
pub use salt::Salt;
