use thiserror::Error;

use super::ciphers::{SyncCipherCallback, lookup_cipher_sync};
use super::cloakconfig::{ALLOWED_BLOCKSIZES, CloakConfig, FILESYSTEM_FORMAT_VERSION, FilesystemId};
use super::loader::{CLOAKFS_VERSION, CommandLineFlags};
use crate::localstate::{ClientId, FilesystemMetadata, LocalStateDir};
use cloakfs_crypto::symmetric::{CipherDef, EncryptionKey};

/// Cipher used for new filesystems unless overridden on the command line.
pub const DEFAULT_CIPHER: &str = "xchacha20-poly1305";

/// Block size used for new filesystems unless overridden on the command line.
pub const DEFAULT_BLOCKSIZE_BYTES: u32 = 16 * 1024;

const DEFAULT_MISSING_BLOCK_IS_INTEGRITY_VIOLATION: bool = false;

#[derive(Error, Debug)]
pub enum ConfigCreateError {
    #[error("The cipher '{cipher_name}' is not supported")]
    CipherNotSupported { cipher_name: String },

    #[error("The block size of {blocksize_bytes} bytes is not supported")]
    BlocksizeNotSupported { blocksize_bytes: u32 },

    #[error("Error checking the local state of the file system: {0:?}")]
    LocalStateError(anyhow::Error),
}

#[derive(Debug)]
pub struct ConfigCreateResult {
    pub config: CloakConfig,
    pub my_client_id: ClientId,
    pub encryption_key: EncryptionKey,
}

/// Builds the config for a new filesystem: fresh filesystem id, fresh inner
/// encryption key of the chosen cipher's key size, fresh root blob id, and
/// cipher/blocksize/integrity-mode from the command line flags or defaults.
pub fn create(
    command_line_flags: &CommandLineFlags,
    local_state_dir: &LocalStateDir,
    allow_replaced_filesystem: bool,
) -> Result<ConfigCreateResult, ConfigCreateError> {
    let cipher_name = command_line_flags
        .expected_cipher
        .clone()
        .unwrap_or_else(|| DEFAULT_CIPHER.to_string());
    let blocksize = command_line_flags
        .blocksize_bytes
        .unwrap_or(DEFAULT_BLOCKSIZE_BYTES);
    if !ALLOWED_BLOCKSIZES.contains(&blocksize) {
        return Err(ConfigCreateError::BlocksizeNotSupported {
            blocksize_bytes: blocksize,
        });
    }
    let encryption_key = _generate_encryption_key(&cipher_name)?;
    let filesystem_id = FilesystemId::new_random();
    let local_state = FilesystemMetadata::load_or_generate(
        local_state_dir,
        &filesystem_id,
        &encryption_key,
        allow_replaced_filesystem,
    )
    .map_err(|err| ConfigCreateError::LocalStateError(err.into()))?;
    let my_client_id = *local_state.my_client_id();
    let exclusive_client_id = _generate_exclusive_client_id(my_client_id, command_line_flags)
        .map(|id| id.id.get());
    let config = CloakConfig {
        root_blob: _generate_root_blob_id(),
        enc_key: encryption_key.to_hex(),
        cipher: cipher_name,
        format_version: FILESYSTEM_FORMAT_VERSION.to_string(),
        created_with_version: CLOAKFS_VERSION.to_string(),
        last_opened_with_version: CLOAKFS_VERSION.to_string(),
        blocksize_bytes: blocksize,
        filesystem_id,
        exclusive_client_id,
    };

    Ok(ConfigCreateResult {
        config,
        my_client_id,
        encryption_key,
    })
}

fn _generate_encryption_key(cipher_name: &str) -> Result<EncryptionKey, ConfigCreateError> {
    struct CreateKeyCallback;
    impl SyncCipherCallback for CreateKeyCallback {
        type Result = EncryptionKey;
        fn callback<C: CipherDef + Send + Sync + 'static>(self) -> Self::Result {
            EncryptionKey::generate_random(C::KEY_SIZE)
        }
    }
    lookup_cipher_sync(cipher_name, CreateKeyCallback).map_err(|_| {
        ConfigCreateError::CipherNotSupported {
            cipher_name: cipher_name.to_string(),
        }
    })
}

fn _generate_root_blob_id() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

fn _generate_exclusive_client_id(
    my_client_id: ClientId,
    command_line_flags: &CommandLineFlags,
) -> Option<ClientId> {
    let single_client_mode = command_line_flags
        .missing_block_is_integrity_violation
        .unwrap_or(DEFAULT_MISSING_BLOCK_IS_INTEGRITY_VIOLATION);
    if single_client_mode {
        Some(my_client_id)
    } else {
        None
    }
}
