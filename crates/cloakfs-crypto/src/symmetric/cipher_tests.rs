use super::{Aes128Gcm, Aes256Gcm, Cipher, CipherDef, EncryptionKey, XChaCha20Poly1305};
use rand::{RngCore, SeedableRng, rngs::StdRng};

fn key<C: CipherDef>(seed: u64) -> EncryptionKey {
    let mut rng = StdRng::seed_from_u64(seed);
    EncryptionKey::new_infallible(C::KEY_SIZE, move |key_data| rng.fill_bytes(key_data))
}

fn encrypt_decrypt_roundtrip<C: CipherDef>() {
    let cipher = C::new(key::<C>(1)).unwrap();
    let plaintext = b"some plaintext that is long enough to span a few blocks of the cipher";
    let aad = b"header bytes";
    let ciphertext = cipher.encrypt(plaintext, aad).unwrap();
    assert_eq!(
        plaintext.len() + C::CIPHERTEXT_OVERHEAD_PREFIX + C::CIPHERTEXT_OVERHEAD_SUFFIX,
        ciphertext.len()
    );
    let decrypted = cipher.decrypt(&ciphertext, aad).unwrap();
    assert_eq!(plaintext.as_slice(), decrypted.as_slice());
}

fn encrypt_decrypt_empty_plaintext<C: CipherDef>() {
    let cipher = C::new(key::<C>(1)).unwrap();
    let ciphertext = cipher.encrypt(b"", b"").unwrap();
    let decrypted = cipher.decrypt(&ciphertext, b"").unwrap();
    assert_eq!(b"".as_slice(), decrypted.as_slice());
}

fn decrypt_with_wrong_key_fails<C: CipherDef>() {
    let ciphertext = C::new(key::<C>(1))
        .unwrap()
        .encrypt(b"some plaintext", b"")
        .unwrap();
    C::new(key::<C>(2))
        .unwrap()
        .decrypt(&ciphertext, b"")
        .unwrap_err();
}

fn decrypt_modified_ciphertext_fails<C: CipherDef>() {
    let cipher = C::new(key::<C>(1)).unwrap();
    let mut ciphertext = cipher.encrypt(b"some plaintext", b"").unwrap();
    for flip_position in [0, C::CIPHERTEXT_OVERHEAD_PREFIX, ciphertext.len() - 1] {
        ciphertext[flip_position] ^= 0x01;
        cipher.decrypt(&ciphertext, b"").unwrap_err();
        ciphertext[flip_position] ^= 0x01;
    }
    // Undoing the flips must restore decryptability
    cipher.decrypt(&ciphertext, b"").unwrap();
}

fn decrypt_with_wrong_associated_data_fails<C: CipherDef>() {
    let cipher = C::new(key::<C>(1)).unwrap();
    let ciphertext = cipher.encrypt(b"some plaintext", b"right aad").unwrap();
    cipher.decrypt(&ciphertext, b"wrong aad").unwrap_err();
    cipher.decrypt(&ciphertext, b"").unwrap_err();
}

fn decrypt_too_small_ciphertext_fails<C: CipherDef>() {
    let cipher = C::new(key::<C>(1)).unwrap();
    let too_small = vec![0u8; C::CIPHERTEXT_OVERHEAD_PREFIX + C::CIPHERTEXT_OVERHEAD_SUFFIX - 1];
    cipher.decrypt(&too_small, b"").unwrap_err();
}

fn new_with_wrong_key_size_fails<C: CipherDef + std::fmt::Debug>() {
    let err = C::new(EncryptionKey::generate_random(C::KEY_SIZE + 1)).unwrap_err();
    assert_eq!(C::KEY_SIZE, err.expected);
    assert_eq!(C::KEY_SIZE + 1, err.got);
}

macro_rules! cipher_tests {
    ($module_name:ident, $cipher:ty) => {
        mod $module_name {
            use super::*;

            #[test]
            fn roundtrip() {
                encrypt_decrypt_roundtrip::<$cipher>();
            }

            #[test]
            fn roundtrip_empty() {
                encrypt_decrypt_empty_plaintext::<$cipher>();
            }

            #[test]
            fn wrong_key() {
                decrypt_with_wrong_key_fails::<$cipher>();
            }

            #[test]
            fn modified_ciphertext() {
                decrypt_modified_ciphertext_fails::<$cipher>();
            }

            #[test]
            fn wrong_associated_data() {
                decrypt_with_wrong_associated_data_fails::<$cipher>();
            }

            #[test]
            fn too_small_ciphertext() {
                decrypt_too_small_ciphertext_fails::<$cipher>();
            }

            #[test]
            fn wrong_key_size() {
                new_with_wrong_key_size_fails::<$cipher>();
            }
        }
    };
}

cipher_tests!(xchacha20poly1305, XChaCha20Poly1305);
cipher_tests!(aes256gcm, Aes256Gcm);
cipher_tests!(aes128gcm, Aes128Gcm);

#[test]
fn key_sizes() {
    assert_eq!(32, XChaCha20Poly1305::KEY_SIZE);
    assert_eq!(32, Aes256Gcm::KEY_SIZE);
    assert_eq!(16, Aes128Gcm::KEY_SIZE);
}
