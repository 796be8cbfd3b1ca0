use derive_more::From;
use rand::{Rng as _, rng};
use std::fmt::Debug;

pub const SALT_LEN: usize = 8;

#[derive(Clone, Copy, Eq, PartialEq, From)]
pub struct Salt([u8; SALT_LEN]);

impl Salt {
    pub fn new(bytes: [u8; SALT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn get(&self) -> &[u8; SALT_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(hex)?;
        if bytes.len() != SALT_LEN {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut array = [0u8; SALT_LEN];
        array.copy_from_slice(&bytes);
        Ok(Self(array))
    }

    pub fn generate_random() -> Self {
        Self(rng().random())
    }
}

impl Debug for Salt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Salt").field(&hex::encode(self.0)).finish()
    }
}
