//! Key derivation functions (KDFs) for password-based encryption.
//!
//! A KDF turns a password into a cryptographic key of the required length,
//! adding computational cost against brute-force attacks and a salt against
//! rainbow tables. The parameters (including the salt) must be stored
//! alongside the encrypted data so the same key can be re-derived later.

use super::symmetric::EncryptionKey;
use anyhow::Result;
use std::fmt::Debug;

/// Serializable parameters for a key derivation function.
///
/// These contain the salt and the algorithm-specific cost settings needed to
/// reproduce a derived key. The serialized form is stored in cleartext in the
/// config descriptor header.
pub trait KDFParameters: Sized + Debug {
    /// Serializes the parameters to a byte vector. The format must be
    /// deterministic and compatible with [`KDFParameters::deserialize`].
    fn serialize(&self) -> Vec<u8>;

    /// Deserializes parameters from a byte slice.
    fn deserialize(serialized: &[u8]) -> Result<Self>;
}

/// A password-based key derivation function.
///
/// The same password and parameters always produce the same key; fresh
/// parameters (with a fresh random salt) must be generated for every new
/// filesystem.
pub trait PasswordBasedKDF {
    /// Configuration for generating new parameters (e.g. memory cost)
    type Settings;
    /// The actual parameters used for key derivation (includes the salt)
    type Parameters: KDFParameters;

    /// Derives an encryption key of `key_size` bytes from a password.
    fn derive_key(
        key_size: usize,
        password: &str,
        kdf_parameters: &Self::Parameters,
    ) -> EncryptionKey;

    /// Generates a new set of KDF parameters with a fresh random salt.
    fn generate_parameters(settings: &Self::Settings) -> Result<Self::Parameters>;
}

pub mod scrypt;
