use anyhow::{Context, anyhow};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::ciphers::cipher_key_size;
use super::cloakconfig::{
    ALLOWED_BLOCKSIZES, CloakConfig, FILESYSTEM_FORMAT_VERSION, FilesystemId,
};
use super::configfile::{
    Access, CloakConfigFile, CreateConfigFileError, LoadConfigFileError, SaveConfigFileError,
};
use super::creator::{self, ConfigCreateError};
use super::key_provider::KeyProvider;
use crate::error::ErrorCode;
use crate::localstate::{
    BasedirMetadata, CheckFilesystemIdError, ClientId, FilesystemMetadata,
    FilesystemMetadataError, LocalStateDir,
};
use cloakfs_crypto::kdf::PasswordBasedKDF;
use cloakfs_crypto::symmetric::EncryptionKey;
use cloakfs_version::Version;

/// Version of this release, written into `last_opened_with_version` (and
/// `created_with_version` for new filesystems).
pub const CLOAKFS_VERSION: Version<&'static str> = cloakfs_version::cargo_version!();

const MIN_SUPPORTED_FORMAT_VERSION: Version<&'static str> = match Version::parse_const("0.9.4") {
    Ok(version) => version,
    Err(_) => panic!("Invalid minimum supported format version"),
};
const MAX_SUPPORTED_FORMAT_VERSION: Version<&'static str> = FILESYSTEM_FORMAT_VERSION;

#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("Invalid data in config file: {0:?}")]
    InvalidConfig(anyhow::Error),

    #[error("This filesystem uses storage format {actual_format_version} which is not supported anymore. Please migrate the filesystem to a supported version first by opening it with a release that supports format {min_supported_format_version}.")]
    TooOldFilesystemFormat {
        actual_format_version: String,
        min_supported_format_version: Version<&'static str>,
    },

    #[error("This filesystem uses storage format {actual_format_version} and would have to be migrated to {max_supported_format_version}, but the upgrade wasn't allowed. Re-run with the upgrade allowed to migrate it.")]
    TooOldFilesystemFormatUpgradeNotAllowed {
        actual_format_version: String,
        max_supported_format_version: Version<&'static str>,
    },

    #[error("This filesystem uses storage format {actual_format_version} but this release only supports formats up to {max_supported_format_version}. Please update to a newer release.")]
    TooNewFilesystemFormat {
        actual_format_version: String,
        max_supported_format_version: Version<&'static str>,
    },

    #[error("Error loading config file: {0:?}")]
    LoadFileError(#[from] LoadConfigFileError),

    #[error("Error saving config file modifications: {0:?}")]
    SaveFileError(#[from] SaveConfigFileError),

    #[error("Error creating config: {0:?}")]
    ConfigCreateError(#[from] ConfigCreateError),

    #[error("Error creating config file: {0:?}")]
    CreateFileError(#[from] CreateConfigFileError),

    #[error("Wrong cipher: Expected {expected_cipher} but found {actual_cipher}")]
    WrongCipher {
        expected_cipher: String,
        actual_cipher: String,
    },

    #[error("Error checking the local state of the file system: {0:?}")]
    LocalStateError(anyhow::Error),

    #[error("The filesystem encryption key differs from the last time we loaded this filesystem. Did an attacker replace the file system?")]
    EncryptionKeyChanged,

    #[error("You specified on the command line to treat missing blocks as integrity violations, but the file system is not setup to do that.")]
    FilesystemDoesNotTreatMissingBlocksAsIntegrityViolations,

    #[error("You specified on the command line to not treat missing blocks as integrity violations, but the file system is setup to do that.")]
    FilesystemTreatsMissingBlocksAsIntegrityViolations,

    #[error("File system is in single-client mode and can only be used from the client that created it.")]
    FilesystemInSingleClientMode,

    #[error("The filesystem id in the basedir {basedir} changed from {previous_id:?} to {new_id:?}. This likely means an attacker replaced the filesystem with a different one. Pass the flag allowing replaced filesystems if this was intentional.")]
    FilesystemIdChanged {
        basedir: PathBuf,
        previous_id: FilesystemId,
        new_id: FilesystemId,
    },
}

impl ConfigLoadError {
    /// The stable error code this error maps to at the process boundary.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidConfig(_) => ErrorCode::InvalidFilesystem,
            Self::TooOldFilesystemFormat { .. } => ErrorCode::TooOldFormat,
            Self::TooOldFilesystemFormatUpgradeNotAllowed { .. } => ErrorCode::UpgradeRequired,
            Self::TooNewFilesystemFormat { .. } => ErrorCode::TooNewFormat,
            Self::LoadFileError(LoadConfigFileError::DecryptionFailed) => {
                ErrorCode::WrongCredential
            }
            Self::LoadFileError(_) => ErrorCode::InvalidFilesystem,
            Self::SaveFileError(_) => ErrorCode::InvalidFilesystem,
            Self::ConfigCreateError(_) => ErrorCode::UnspecifiedError,
            Self::CreateFileError(_) => ErrorCode::InvalidFilesystem,
            Self::WrongCipher { .. } => ErrorCode::CipherMismatch,
            Self::LocalStateError(_) => ErrorCode::UnspecifiedError,
            Self::EncryptionKeyChanged => ErrorCode::EncryptionKeyChanged,
            Self::FilesystemDoesNotTreatMissingBlocksAsIntegrityViolations
            | Self::FilesystemTreatsMissingBlocksAsIntegrityViolations => {
                ErrorCode::IntegritySetupMismatch
            }
            Self::FilesystemInSingleClientMode => ErrorCode::SingleClientViolation,
            Self::FilesystemIdChanged { .. } => ErrorCode::FilesystemIdChanged,
        }
    }
}

#[derive(Debug)]
pub struct ConfigLoadResult {
    // loading a config file updates it, e.g. the "last_opened_with_version" field,
    // but this member keeps the original config
    pub old_config: CloakConfig,

    pub config: CloakConfigFile,

    pub my_client_id: ClientId,

    /// The inner encryption key; this is what the block layer encrypts with
    pub encryption_key: EncryptionKey,

    // True if this config file / file system was just created and wasn't opened from an existing config file
    pub first_time_access: bool,
}

#[derive(Clone, Debug, Default)]
pub struct CommandLineFlags {
    pub missing_block_is_integrity_violation: Option<bool>,
    pub expected_cipher: Option<String>,
    pub blocksize_bytes: Option<u32>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LoadFlags {
    pub allow_filesystem_upgrade: bool,
    pub allow_replaced_filesystem: bool,
}

pub fn load_or_create<K: PasswordBasedKDF>(
    filename: PathBuf,
    basedir: &Path,
    key_provider: &mut KeyProvider<K>,
    command_line_flags: &CommandLineFlags,
    load_flags: &LoadFlags,
    local_state_dir: &LocalStateDir,
) -> Result<ConfigLoadResult, ConfigLoadError> {
    if filename.exists() {
        _load(
            filename,
            basedir,
            key_provider,
            command_line_flags,
            load_flags,
            local_state_dir,
            Access::ReadWrite,
        )
    } else {
        _create(
            filename,
            basedir,
            key_provider,
            command_line_flags,
            load_flags,
            local_state_dir,
        )
    }
}

pub fn load_readonly<K: PasswordBasedKDF>(
    filename: PathBuf,
    basedir: &Path,
    key_provider: &mut KeyProvider<K>,
    command_line_flags: &CommandLineFlags,
    load_flags: &LoadFlags,
    local_state_dir: &LocalStateDir,
) -> Result<ConfigLoadResult, ConfigLoadError> {
    _load(
        filename,
        basedir,
        key_provider,
        command_line_flags,
        load_flags,
        local_state_dir,
        Access::ReadOnly,
    )
}

/// Re-encrypts the config file with a new outer key derived from
/// `new_key_provider`. The config itself, including the inner encryption key,
/// is unchanged; the blocks in the basedir don't have to be rewritten.
pub fn change_encryption_key<K1: PasswordBasedKDF, K2: PasswordBasedKDF>(
    filename: PathBuf,
    key_provider: &mut KeyProvider<K1>,
    new_key_provider: &mut KeyProvider<K2>,
    command_line_flags: &CommandLineFlags,
    load_flags: &LoadFlags,
    local_state_dir: &LocalStateDir,
) -> Result<(), ConfigLoadError> {
    let mut configfile = CloakConfigFile::load(filename, key_provider, Access::ReadWrite)?;
    _fixup_legacy_format_version(&mut configfile);
    _check_version(configfile.config(), load_flags.allow_filesystem_upgrade)?;
    _check_cipher(
        configfile.config(),
        command_line_flags.expected_cipher.as_deref(),
    )?;
    let encryption_key = _parse_encryption_key(configfile.config())?;
    _load_local_state(
        local_state_dir,
        configfile.config(),
        &encryption_key,
        load_flags.allow_replaced_filesystem,
    )?;
    configfile.change_encryption_key(new_key_provider)?;
    Ok(())
}

fn _create<K: PasswordBasedKDF>(
    filename: PathBuf,
    basedir: &Path,
    key_provider: &mut KeyProvider<K>,
    command_line_flags: &CommandLineFlags,
    load_flags: &LoadFlags,
    local_state_dir: &LocalStateDir,
) -> Result<ConfigLoadResult, ConfigLoadError> {
    let created = creator::create(
        command_line_flags,
        local_state_dir,
        load_flags.allow_replaced_filesystem,
    )?;
    let configfile = CloakConfigFile::create_new(filename, created.config.clone(), key_provider)?;
    _check_and_update_basedir_binding(
        basedir,
        &created.config.filesystem_id,
        load_flags.allow_replaced_filesystem,
        local_state_dir,
    )?;
    Ok(ConfigLoadResult {
        old_config: created.config,
        config: configfile,
        my_client_id: created.my_client_id,
        encryption_key: created.encryption_key,
        first_time_access: true,
    })
}

fn _load<K: PasswordBasedKDF>(
    filename: PathBuf,
    basedir: &Path,
    key_provider: &mut KeyProvider<K>,
    command_line_flags: &CommandLineFlags,
    load_flags: &LoadFlags,
    local_state_dir: &LocalStateDir,
    access: Access,
) -> Result<ConfigLoadResult, ConfigLoadError> {
    let mut configfile = CloakConfigFile::load(filename, key_provider, access)?;
    let old_config = configfile.config().clone();
    _fixup_legacy_format_version(&mut configfile);
    _check_version(configfile.config(), load_flags.allow_filesystem_upgrade)?;
    _update_version_in_config(&mut configfile);
    _check_cipher(
        configfile.config(),
        command_line_flags.expected_cipher.as_deref(),
    )?;
    let encryption_key = _parse_encryption_key(configfile.config())?;
    let local_state = _load_local_state(
        local_state_dir,
        configfile.config(),
        &encryption_key,
        load_flags.allow_replaced_filesystem,
    )?;
    let my_client_id = *local_state.my_client_id();
    _check_missing_blocks_are_integrity_violations(
        configfile.config(),
        my_client_id,
        command_line_flags,
    )?;
    // Refreshing `format_version` and `last_opened_with_version` on disk is
    // best-effort. The config was decrypted successfully, so don't fail the
    // load over an I/O error here.
    if let Err(err) = configfile.save_if_modified_and_has_readwrite_access() {
        log::error!("Error saving the updated config file: {err:?}");
    }
    _check_and_update_basedir_binding(
        basedir,
        &configfile.config().filesystem_id,
        load_flags.allow_replaced_filesystem,
        local_state_dir,
    )?;
    Ok(ConfigLoadResult {
        old_config,
        config: configfile,
        my_client_id,
        encryption_key,
        first_time_access: false,
    })
}

fn _fixup_legacy_format_version(configfile: &mut CloakConfigFile) {
    // The 0.9.7 and 0.9.8 releases wrote their own release version where the
    // format version belonged; the format they actually wrote is 0.9.6.
    // Normalize in memory before any version gate runs.
    let format_version = configfile.config().format_version.as_str();
    if format_version == "0.9.7" || format_version == "0.9.8" {
        configfile.config_mut().format_version = "0.9.6".to_string();
    }
}

fn _check_version(config: &CloakConfig, allow_filesystem_upgrade: bool) -> Result<(), ConfigLoadError> {
    let actual_format_version = Version::parse(&config.format_version).map_err(|_| {
        ConfigLoadError::InvalidConfig(anyhow!(
            "Could not parse format version number {} from config file",
            config.format_version
        ))
    })?;
    // TODO Make these asserts const_assert
    assert!(CLOAKFS_VERSION >= MAX_SUPPORTED_FORMAT_VERSION);
    assert!(MAX_SUPPORTED_FORMAT_VERSION >= MIN_SUPPORTED_FORMAT_VERSION);

    if actual_format_version < MIN_SUPPORTED_FORMAT_VERSION {
        return Err(ConfigLoadError::TooOldFilesystemFormat {
            actual_format_version: actual_format_version.to_string(),
            min_supported_format_version: MIN_SUPPORTED_FORMAT_VERSION,
        });
    }
    if actual_format_version > MAX_SUPPORTED_FORMAT_VERSION {
        return Err(ConfigLoadError::TooNewFilesystemFormat {
            actual_format_version: actual_format_version.to_string(),
            max_supported_format_version: MAX_SUPPORTED_FORMAT_VERSION,
        });
    }
    if actual_format_version < MAX_SUPPORTED_FORMAT_VERSION && !allow_filesystem_upgrade {
        return Err(ConfigLoadError::TooOldFilesystemFormatUpgradeNotAllowed {
            actual_format_version: actual_format_version.to_string(),
            max_supported_format_version: MAX_SUPPORTED_FORMAT_VERSION,
        });
    }
    Ok(())
}

fn _update_version_in_config(configfile: &mut CloakConfigFile) {
    let format_version_needs_update = Version::parse(&configfile.config().format_version)
        .expect("Format version was already validated in _check_version")
        != FILESYSTEM_FORMAT_VERSION;
    if format_version_needs_update {
        configfile.config_mut().format_version = FILESYSTEM_FORMAT_VERSION.to_string();
    }
    if configfile.config().last_opened_with_version != CLOAKFS_VERSION.to_string() {
        configfile.config_mut().last_opened_with_version = CLOAKFS_VERSION.to_string();
    }
}

fn _check_cipher(config: &CloakConfig, expected_cipher: Option<&str>) -> Result<(), ConfigLoadError> {
    if let Some(expected_cipher) = expected_cipher {
        if config.cipher != expected_cipher {
            return Err(ConfigLoadError::WrongCipher {
                actual_cipher: config.cipher.clone(),
                expected_cipher: expected_cipher.to_string(),
            });
        }
    }
    Ok(())
}

/// Reads the inner encryption key from the config and checks the invariants
/// the block layer relies on: the key length matches the cipher's key size
/// and the block size is one of the allowed sizes.
fn _parse_encryption_key(config: &CloakConfig) -> Result<EncryptionKey, ConfigLoadError> {
    let encryption_key = EncryptionKey::from_hex(&config.enc_key)
        .context("Tried to read encryption key from config")
        .map_err(ConfigLoadError::InvalidConfig)?;
    let expected_key_size = cipher_key_size(&config.cipher)
        .map_err(|err| ConfigLoadError::InvalidConfig(err.into()))?;
    if encryption_key.num_bytes() != expected_key_size {
        return Err(ConfigLoadError::InvalidConfig(anyhow!(
            "Encryption key has {} bytes but cipher {} needs {} bytes",
            encryption_key.num_bytes(),
            config.cipher,
            expected_key_size,
        )));
    }
    if !ALLOWED_BLOCKSIZES.contains(&config.blocksize_bytes) {
        return Err(ConfigLoadError::InvalidConfig(anyhow!(
            "Block size of {} bytes is not supported",
            config.blocksize_bytes,
        )));
    }
    Ok(encryption_key)
}

fn _load_local_state(
    local_state_dir: &LocalStateDir,
    config: &CloakConfig,
    encryption_key: &EncryptionKey,
    allow_replaced_filesystem: bool,
) -> Result<FilesystemMetadata, ConfigLoadError> {
    FilesystemMetadata::load_or_generate(
        local_state_dir,
        &config.filesystem_id,
        encryption_key,
        allow_replaced_filesystem,
    )
    .map_err(|err| match err {
        FilesystemMetadataError::EncryptionKeyChanged => ConfigLoadError::EncryptionKeyChanged,
        FilesystemMetadataError::LoadSaveError(err) => ConfigLoadError::LocalStateError(err),
    })
}

fn _check_missing_blocks_are_integrity_violations(
    config: &CloakConfig,
    my_client_id: ClientId,
    command_line_flags: &CommandLineFlags,
) -> Result<(), ConfigLoadError> {
    if command_line_flags.missing_block_is_integrity_violation == Some(true)
        && config.exclusive_client_id.is_none()
    {
        return Err(ConfigLoadError::FilesystemDoesNotTreatMissingBlocksAsIntegrityViolations);
    }
    if command_line_flags.missing_block_is_integrity_violation == Some(false)
        && config.exclusive_client_id.is_some()
    {
        return Err(ConfigLoadError::FilesystemTreatsMissingBlocksAsIntegrityViolations);
    }
    if let Some(exclusive_client_id) = config.exclusive_client_id {
        let exclusive_client_id = ClientId {
            id: NonZeroU32::try_from(exclusive_client_id)
                .map_err(|err| ConfigLoadError::InvalidConfig(err.into()))?,
        };
        if exclusive_client_id != my_client_id {
            return Err(ConfigLoadError::FilesystemInSingleClientMode);
        }
    }
    Ok(())
}

fn _check_and_update_basedir_binding(
    basedir: &Path,
    filesystem_id: &FilesystemId,
    allow_replaced_filesystem: bool,
    local_state_dir: &LocalStateDir,
) -> Result<(), ConfigLoadError> {
    let mut basedir_metadata =
        BasedirMetadata::load(local_state_dir).map_err(ConfigLoadError::LocalStateError)?;
    if !allow_replaced_filesystem {
        basedir_metadata
            .filesystem_id_for_basedir_is_correct(basedir, filesystem_id)
            .map_err(
                |CheckFilesystemIdError::FilesystemIdIncorrect {
                     basedir,
                     expected_id,
                     actual_id,
                 }| ConfigLoadError::FilesystemIdChanged {
                    basedir,
                    previous_id: actual_id,
                    new_id: expected_id,
                },
            )?;
    }
    basedir_metadata
        .update_filesystem_id_for_basedir(basedir, *filesystem_id, local_state_dir)
        .map_err(ConfigLoadError::LocalStateError)?;
    Ok(())
}

// Tests are in tests/loader.rs; they exercise the full load/create/change-key
// pipeline against real files in a temp directory.
