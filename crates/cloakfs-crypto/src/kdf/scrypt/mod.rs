//! Scrypt key derivation function.
//!
//! Scrypt is a memory-hard password-based KDF, which makes hardware attacks
//! (ASICs and GPUs) expensive. Cost is controlled by three parameters:
//!
//! - **N (log_n)**: CPU/memory cost parameter (as a power of 2)
//! - **r**: Block size parameter
//! - **p**: Parallelization parameter
//!
//! Preset configurations are available via [`ScryptSettings`]; see there for
//! the memory usage of each preset.
//!
//! # Example
//!
//! ```
//! use cloakfs_crypto::kdf::scrypt::{Scrypt, ScryptSettings};
//! use cloakfs_crypto::kdf::PasswordBasedKDF;
//!
//! // Generate parameters with test settings (fast, for examples only)
//! let params = Scrypt::generate_parameters(&ScryptSettings::TEST).unwrap();
//!
//! // Derive a 32-byte encryption key
//! let key = Scrypt::derive_key(32, "my_secure_password", &params);
//! assert_eq!(key.num_bytes(), 32);
//! ```

mod params;
pub use params::ScryptParams;

mod settings;
pub use settings::ScryptSettings;

use super::PasswordBasedKDF;
use crate::symmetric::EncryptionKey;
use anyhow::Result;

/// Scrypt implementation based on the pure Rust `scrypt` crate.
pub struct Scrypt;

impl PasswordBasedKDF for Scrypt {
    type Settings = ScryptSettings;
    type Parameters = ScryptParams;

    fn derive_key(
        key_size: usize,
        password: &str,
        kdf_parameters: &ScryptParams,
    ) -> EncryptionKey {
        let params = scrypt::Params::new(
            kdf_parameters.log_n(),
            kdf_parameters.r(),
            kdf_parameters.p(),
            key_size,
        )
        .expect("Invalid scrypt parameters");
        EncryptionKey::new_infallible(key_size, |key_data| {
            scrypt::scrypt(
                password.as_bytes(),
                kdf_parameters.salt(),
                &params,
                key_data,
            )
            .expect("Error in scrypt")
        })
    }

    fn generate_parameters(settings: &ScryptSettings) -> Result<ScryptParams> {
        ScryptParams::generate(settings)
    }
}
