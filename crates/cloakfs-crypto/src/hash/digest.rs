use std::fmt::Debug;

pub const DIGEST_LEN: usize = 64;

/// A SHA-512 digest.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    pub fn new(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(hex)?;
        if bytes.len() != DIGEST_LEN {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut array = [0u8; DIGEST_LEN];
        array.copy_from_slice(&bytes);
        Ok(Self(array))
    }
}

impl Debug for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Digest").field(&hex::encode(self.0)).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_hex_and_from_hex() {
        let original = Digest([42u8; DIGEST_LEN]);
        let hex = original.to_hex();
        let restored = Digest::from_hex(&hex).unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn from_hex_invalid_length() {
        Digest::from_hex("abcd").unwrap_err();
        Digest::from_hex(&"a".repeat(DIGEST_LEN * 2 + 2)).unwrap_err();
    }

    #[test]
    fn from_hex_invalid_chars() {
        Digest::from_hex(&"z".repeat(DIGEST_LEN * 2)).unwrap_err();
    }

    #[test]
    fn debug_format() {
        let digest = Digest::new([0xab; DIGEST_LEN]);
        let debug_str = format!("{:?}", digest);
        assert!(debug_str.contains("Digest"));
        assert!(debug_str.contains(&digest.to_hex()));
    }
}
