use anyhow::{Result, ensure};
use log::warn;
use rand::RngCore;
use std::convert::Infallible;
use zeroize::Zeroize;

/// An encryption key for a cipher. The key is stored in protected memory, i.e.
/// it shouldn't be swapped to disk and will be automatically zeroed on destruction.
/// Note that this is only a best-effort and not guaranteed. There's still scenarios
/// (say when the PC is suspended to disk) where the key will end up on the disk.
pub struct EncryptionKey {
    key_data: Box<[u8]>,
    _lock_guard: Option<region::LockGuard>,
}

impl EncryptionKey {
    pub fn new<E>(
        num_bytes: usize,
        init: impl FnOnce(&mut [u8]) -> Result<(), E>,
    ) -> Result<Self, E> {
        let mut key_data: Box<[u8]> = vec![0u8; num_bytes].into_boxed_slice();
        let lock_guard = region::lock(key_data.as_ptr(), key_data.len());
        let lock_guard = match lock_guard {
            Ok(lock_guard) => Some(lock_guard),
            Err(err) => {
                warn!(
                    "Couldn't protect the RAM page storing the encryption key, which means it could get swapped to the disk if your operating system chooses to. This does not hinder any functionality though. Error: {}",
                    err
                );
                None
            }
        };
        init(&mut key_data)?;
        Ok(Self {
            key_data,
            _lock_guard: lock_guard,
        })
    }

    pub fn new_infallible(num_bytes: usize, init: impl FnOnce(&mut [u8])) -> Self {
        match Self::new::<Infallible>(num_bytes, |data| {
            init(data);
            Ok(())
        }) {
            Ok(key) => key,
            Err(err) => match err {},
        }
    }

    /// Creates a key with `num_bytes` bytes of cryptographically secure random data.
    pub fn generate_random(num_bytes: usize) -> Self {
        Self::new_infallible(num_bytes, |data| rand::rng().fill_bytes(data))
    }

    /// Create key data from a hex string. Note that this circumvents the memory
    /// protection because the data exists somewhere else before creating the
    /// EncryptionKey object.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        ensure!(
            hex_str.len() % 2 == 0,
            "Hex string must have an even length"
        );
        let num_bytes = hex_str.len() / 2;
        Self::new(num_bytes, |data| {
            hex::decode_to_slice(hex_str, data)?;
            Ok(())
        })
    }

    /// Create a hex string with the key data. Note that this circumvents the
    /// memory protection because the data gets copied to an unprotected string.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(&self.key_data)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.key_data
    }

    pub fn num_bytes(&self) -> usize {
        self.key_data.len()
    }
}

impl Clone for EncryptionKey {
    fn clone(&self) -> Self {
        Self::new_infallible(self.key_data.len(), |data| {
            data.copy_from_slice(&self.key_data);
        })
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EncryptionKey(len={})", self.key_data.len())
    }
}

impl Drop for EncryptionKey {
    fn drop(&mut self) {
        self.key_data.zeroize();
    }
}

impl PartialEq for EncryptionKey {
    fn eq(&self, other: &Self) -> bool {
        self.key_data == other.key_data
    }
}

impl Eq for EncryptionKey {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let key = EncryptionKey::generate_random(32);
        let hex = key.to_hex();
        let restored = EncryptionKey::from_hex(&hex).unwrap();
        assert_eq!(key, restored);
    }

    #[test]
    fn from_hex_with_odd_length_fails() {
        EncryptionKey::from_hex("abc").unwrap_err();
    }

    #[test]
    fn from_hex_with_invalid_chars_fails() {
        EncryptionKey::from_hex("nothexnothexnothex!!").unwrap_err();
    }

    #[test]
    fn generate_random_generates_different_keys() {
        let key1 = EncryptionKey::generate_random(32);
        let key2 = EncryptionKey::generate_random(32);
        assert_ne!(key1, key2);
    }

    #[test]
    fn num_bytes() {
        assert_eq!(16, EncryptionKey::generate_random(16).num_bytes());
        assert_eq!(56, EncryptionKey::generate_random(56).num_bytes());
    }

    #[test]
    fn clone_copies_key_data() {
        let key = EncryptionKey::generate_random(32);
        let cloned = key.clone();
        assert_eq!(key, cloned);
    }

    #[test]
    fn debug_doesnt_print_key_data() {
        let key = EncryptionKey::from_hex("0102030405060708").unwrap();
        let debug = format!("{:?}", key);
        assert_eq!("EncryptionKey(len=8)", debug);
        assert!(!debug.contains("0102"));
    }
}
