//! Ciphers from the `aead` crate (and other crates following its traits, for example `aes-gcm`)

use aead::generic_array::typenum::Unsigned;
use aead::{Aead, KeyInit, Nonce, Payload};
use anyhow::{Result, anyhow, ensure};
use rand::RngCore;
use std::marker::PhantomData;

use super::super::{Cipher, CipherDef, EncryptionKey, InvalidKeySizeError};

pub struct AeadCipher<C: Aead + KeyInit> {
    encryption_key: EncryptionKey,
    _phantom: PhantomData<C>,
}

impl<C: Aead + KeyInit> std::fmt::Debug for AeadCipher<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AeadCipher")
            .field("encryption_key", &self.encryption_key)
            .finish()
    }
}

impl<C: Aead + KeyInit> CipherDef for AeadCipher<C> {
    const KEY_SIZE: usize = C::KeySize::USIZE;
    const CIPHERTEXT_OVERHEAD_PREFIX: usize = C::NonceSize::USIZE;
    const CIPHERTEXT_OVERHEAD_SUFFIX: usize = C::TagSize::USIZE;

    fn new(encryption_key: EncryptionKey) -> Result<Self, InvalidKeySizeError> {
        if encryption_key.num_bytes() != Self::KEY_SIZE {
            return Err(InvalidKeySizeError {
                expected: Self::KEY_SIZE,
                got: encryption_key.num_bytes(),
            });
        }
        Ok(Self {
            encryption_key,
            _phantom: PhantomData,
        })
    }
}

impl<C: Aead + KeyInit> Cipher for AeadCipher<C> {
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>> {
        // TODO Move C::new call to constructor so we don't have to do it every time?
        let cipher = C::new_from_slice(self.encryption_key.as_bytes())
            .expect("Key size was already checked in AeadCipher::new");
        let nonce = random_nonce::<C>();
        let ciphertext = cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext,
                    aad: associated_data,
                },
            )
            .map_err(|_| anyhow!("Encrypting data failed"))?;
        let mut result = Vec::with_capacity(Self::CIPHERTEXT_OVERHEAD_PREFIX + ciphertext.len());
        result.extend_from_slice(nonce.as_slice());
        result.extend_from_slice(&ciphertext);
        assert_eq!(
            plaintext.len()
                + Self::CIPHERTEXT_OVERHEAD_PREFIX
                + Self::CIPHERTEXT_OVERHEAD_SUFFIX,
            result.len()
        );
        Ok(result)
    }

    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>> {
        ensure!(
            ciphertext.len() >= Self::CIPHERTEXT_OVERHEAD_PREFIX + Self::CIPHERTEXT_OVERHEAD_SUFFIX,
            "Ciphertext is only {} bytes. That's too small to be decrypted, doesn't even have enough space for nonce and tag",
            ciphertext.len(),
        );
        let cipher = C::new_from_slice(self.encryption_key.as_bytes())
            .expect("Key size was already checked in AeadCipher::new");
        let (nonce, cipherdata) = ciphertext.split_at(Self::CIPHERTEXT_OVERHEAD_PREFIX);
        let plaintext = cipher
            .decrypt(
                Nonce::<C>::from_slice(nonce),
                Payload {
                    msg: cipherdata,
                    aad: associated_data,
                },
            )
            .map_err(|_| anyhow!("Decrypting data failed"))?;
        assert_eq!(
            ciphertext.len()
                - Self::CIPHERTEXT_OVERHEAD_PREFIX
                - Self::CIPHERTEXT_OVERHEAD_SUFFIX,
            plaintext.len()
        );
        Ok(plaintext)
    }

    fn ciphertext_overhead_prefix(&self) -> usize {
        Self::CIPHERTEXT_OVERHEAD_PREFIX
    }

    fn ciphertext_overhead_suffix(&self) -> usize {
        Self::CIPHERTEXT_OVERHEAD_SUFFIX
    }
}

fn random_nonce<C: Aead>() -> Nonce<C> {
    let mut nonce = Nonce::<C>::default();
    rand::rng().fill_bytes(nonce.as_mut_slice());
    nonce
}

// Test cases are in cipher_tests.rs
