use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::Debug;

/// Unique 128-bit identity of a filesystem, assigned randomly at creation and
/// never rewritten afterwards. Serialized as a hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilesystemId([u8; 16]);

impl FilesystemId {
    pub fn new_random() -> Self {
        Self(rand::random())
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(&self) -> [u8; 16] {
        self.0
    }

    pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(hex)?;
        if bytes.len() != 16 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut array = [0u8; 16];
        array.copy_from_slice(&bytes);
        Ok(Self(array))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Debug for FilesystemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FilesystemId")
            .field(&hex::encode(self.0))
            .finish()
    }
}

impl Serialize for FilesystemId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for FilesystemId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex = String::deserialize(deserializer)?;
        FilesystemId::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}
