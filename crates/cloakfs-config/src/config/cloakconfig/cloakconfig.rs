use serde::{Deserialize, Serialize};

use cloakfs_version::Version;

use super::filesystem_id::FilesystemId;
use super::serialization::DeserializationError;

/// Version of the storage format written by this release.
pub const FILESYSTEM_FORMAT_VERSION: Version<&str> = match Version::parse_const("0.10") {
    Ok(version) => version,
    Err(_) => panic!("Invalid filesystem format version"),
};

/// Name the config descriptor file usually has inside a basedir.
pub const DEFAULT_CONFIG_FILE_NAME: &str = "cryfs.config";

/// On-disk block sizes we accept. The block layer rejects anything else, so
/// a descriptor declaring a different size is considered invalid.
pub const ALLOWED_BLOCKSIZES: &[u32] = &[
    4 * 1024,
    8 * 1024,
    16 * 1024,
    32 * 1024,
    64 * 1024,
    128 * 1024,
    256 * 1024,
    512 * 1024,
    1024 * 1024,
];

/// Configuration for a filesystem. This is the cleartext payload of the
/// encrypted config descriptor file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloakConfig {
    /// Blob ID of the root directory
    pub root_blob: String,

    /// Encryption key used for encrypting the blocks of the filesystem, hex encoded.
    /// This is the **inner** key; it never leaves the descriptor unencrypted.
    pub enc_key: String,

    /// Cipher used for encrypting the blocks of the filesystem
    pub cipher: String,

    /// Current version of the format of this filesystem
    pub format_version: String,

    /// Original format version of this filesystem.
    /// This may differ from [CloakConfig::format_version] if the filesystem was migrated.
    pub created_with_version: String,

    /// Version of the last instance that opened this filesystem
    pub last_opened_with_version: String,

    /// Size of the on-disk (i.e. post-encryption) blocks in bytes
    pub blocksize_bytes: u32,

    /// Unique ID of the filesystem
    pub filesystem_id: FilesystemId,

    /// If the exclusive client id is set, then additional integrity measures
    /// (i.e. treating missing blocks as integrity violations) are enabled.
    /// Because this only works in a single-client setting, only this one
    /// client id is allowed to access the filesystem.
    pub exclusive_client_id: Option<u32>,
}

impl CloakConfig {
    pub fn serialize(&self) -> Vec<u8> {
        super::serialization::serialize(self)
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, DeserializationError> {
        super::serialization::deserialize(data)
    }

    pub fn missing_block_is_integrity_violation(&self) -> bool {
        self.exclusive_client_id.is_some()
    }
}
