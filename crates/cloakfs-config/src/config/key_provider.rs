use anyhow::{Context, Result};
use zeroize::Zeroize;

use cloakfs_crypto::kdf::scrypt::Scrypt;
use cloakfs_crypto::kdf::{KDFParameters, PasswordBasedKDF};
use cloakfs_crypto::symmetric::EncryptionKey;

/// Callback observing the bytes of every key the provider derives.
///
/// Frontends use this to cache a "password hash" token so later operations on
/// the same filesystem can skip the (expensive) KDF. The callback must copy
/// the bytes; the slice is owned by the provider and zeroed when it drops.
pub type DerivedKeySink = Box<dyn FnMut(&[u8]) + Send>;

/// Source of the outer key that encrypts the config descriptor: either a
/// password to be run through the KDF, or a pre-derived raw key.
///
/// The provider owns its credential material and zeroes it on drop.
pub struct KeyProvider<K: PasswordBasedKDF = Scrypt> {
    source: KeySource<K>,
    on_derived_key: Option<DerivedKeySink>,
}

enum KeySource<K: PasswordBasedKDF> {
    Direct { key: EncryptionKey },
    PasswordBased { password: String, settings: K::Settings },
}

impl<K: PasswordBasedKDF> KeyProvider<K> {
    /// A provider wrapping a pre-derived raw key, e.g. a cached password hash.
    /// It can only open existing filesystems, not create new ones.
    pub fn direct(key: EncryptionKey) -> Self {
        Self {
            source: KeySource::Direct { key },
            on_derived_key: None,
        }
    }

    /// A provider deriving keys from `password` with the KDF `K`.
    /// `settings` are only used when creating a new filesystem; opening an
    /// existing one uses the parameters stored in its descriptor.
    pub fn password_based(password: String, settings: K::Settings) -> Self {
        Self {
            source: KeySource::PasswordBased { password, settings },
            on_derived_key: None,
        }
    }

    pub fn with_derived_key_sink(mut self, sink: DerivedKeySink) -> Self {
        self.on_derived_key = Some(sink);
        self
    }

    /// Produces the outer key for an existing filesystem, i.e. one whose KDF
    /// parameters were already read from the descriptor header.
    pub fn key_for_existing_filesystem(
        &mut self,
        key_size: usize,
        serialized_kdf_parameters: &[u8],
    ) -> Result<EncryptionKey> {
        let key = match &self.source {
            KeySource::Direct { key } => {
                assert_eq!(
                    key.num_bytes(),
                    key_size,
                    "Direct key provider was asked for a key of a different size than the key it holds",
                );
                key.clone()
            }
            KeySource::PasswordBased { password, .. } => {
                let kdf_parameters = K::Parameters::deserialize(serialized_kdf_parameters)
                    .context("Tried to deserialize the KDF parameters")?;
                K::derive_key(key_size, password, &kdf_parameters)
            }
        };
        self._notify_sink(&key);
        Ok(key)
    }

    /// Produces the outer key and fresh serialized KDF parameters for a new
    /// filesystem.
    ///
    /// # Panics
    ///
    /// Panics for a [`KeyProvider::direct`] provider. A raw key carries no
    /// KDF parameters to store, so using it to create a filesystem is a
    /// programmer error.
    pub fn key_for_new_filesystem(&mut self, key_size: usize) -> Result<(EncryptionKey, Vec<u8>)> {
        let (key, serialized_parameters) = match &self.source {
            KeySource::Direct { .. } => {
                panic!("A direct key provider can't be used to create a new filesystem")
            }
            KeySource::PasswordBased { password, settings } => {
                let kdf_parameters = K::generate_parameters(settings)
                    .context("Tried to generate new KDF parameters")?;
                let key = K::derive_key(key_size, password, &kdf_parameters);
                (key, kdf_parameters.serialize())
            }
        };
        self._notify_sink(&key);
        Ok((key, serialized_parameters))
    }

    fn _notify_sink(&mut self, key: &EncryptionKey) {
        if let Some(sink) = &mut self.on_derived_key {
            sink(key.as_bytes());
        }
    }
}

impl<K: PasswordBasedKDF> Drop for KeySource<K> {
    fn drop(&mut self) {
        if let KeySource::PasswordBased { password, .. } = self {
            password.zeroize();
        }
    }
}
