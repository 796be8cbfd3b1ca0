use derive_more::{Display, Error};

use cloakfs_crypto::symmetric::{Aes128Gcm, Aes256Gcm, CipherDef, XChaCha20Poly1305};

/// All block ciphers a filesystem can be created with, in the order they are
/// offered to the user. The first one is the default.
pub const ALL_CIPHERS: &[&str] = &["xchacha20-poly1305", "aes-256-gcm", "aes-128-gcm"];

#[derive(Error, Display, Debug)]
#[display("Unknown cipher: {}", cipher_name)]
pub struct UnknownCipherError {
    pub cipher_name: String,
}

// offer a way to lookup ciphers at runtime while statically binding its type
pub trait SyncCipherCallback {
    type Result;

    fn callback<C: CipherDef + Send + Sync + 'static>(self) -> Self::Result;
}

pub fn lookup_cipher_sync<CB>(
    cipher_name: &str,
    callback: CB,
) -> Result<CB::Result, UnknownCipherError>
where
    CB: SyncCipherCallback,
{
    match cipher_name {
        "xchacha20-poly1305" => Ok(callback.callback::<XChaCha20Poly1305>()),
        "aes-256-gcm" => Ok(callback.callback::<Aes256Gcm>()),
        "aes-128-gcm" => Ok(callback.callback::<Aes128Gcm>()),
        _ => Err(UnknownCipherError {
            cipher_name: cipher_name.to_string(),
        }),
    }
}

pub fn cipher_is_supported(cipher_name: &str) -> bool {
    cipher_key_size(cipher_name).is_ok()
}

/// Looks up the key size (in bytes) demanded by the given cipher.
pub fn cipher_key_size(cipher_name: &str) -> Result<usize, UnknownCipherError> {
    struct KeySizeCallback;
    impl SyncCipherCallback for KeySizeCallback {
        type Result = usize;
        fn callback<C: CipherDef + Send + Sync + 'static>(self) -> usize {
            C::KEY_SIZE
        }
    }
    lookup_cipher_sync(cipher_name, KeySizeCallback)
}
