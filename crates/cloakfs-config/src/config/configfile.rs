use anyhow::Context;
use std::path::{Path, PathBuf};
use thiserror::Error;
use zeroize::Zeroizing;

use super::cloakconfig::CloakConfig;
use super::encryption::{self, OUTER_KEY_SIZE};
use super::key_provider::KeyProvider;
use crate::utils::write_atomically;
use cloakfs_crypto::kdf::PasswordBasedKDF;
use cloakfs_crypto::symmetric::EncryptionKey;

/// Whether loading a config file is allowed to rewrite it, e.g. to refresh
/// the `last_opened_with_version` field or to persist a format migration.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

#[derive(Error, Debug)]
pub enum LoadConfigFileError {
    #[error("Config file not found at {path}")]
    ConfigFileNotFound { path: PathBuf },

    #[error("Config file is malformed: {0:?}")]
    Malformed(anyhow::Error),

    #[error("Failed to decrypt the config file. Either the password is wrong or the config file is corrupted.")]
    DecryptionFailed,
}

#[derive(Error, Debug)]
pub enum SaveConfigFileError {
    #[error("Error encrypting the config: {0:?}")]
    EncryptError(anyhow::Error),

    #[error("Error writing the config file: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum CreateConfigFileError {
    #[error("Config file already exists at {path}")]
    AlreadyExists { path: PathBuf },

    #[error(transparent)]
    SaveError(#[from] SaveConfigFileError),
}

/// A loaded (or freshly created) config descriptor file.
///
/// Keeps the already-derived outer key and KDF parameters around so that
/// rewriting the file, e.g. to refresh `last_opened_with_version`, doesn't
/// have to run the KDF again.
#[derive(Debug)]
pub struct CloakConfigFile {
    path: PathBuf,
    config: CloakConfig,
    outer_key: EncryptionKey,
    kdf_parameters: Vec<u8>,
    access: Access,
    modified: bool,
}

impl CloakConfigFile {
    /// Creates a new config file at `path`. Fails if a file already exists there.
    pub fn create_new<K: PasswordBasedKDF>(
        path: PathBuf,
        config: CloakConfig,
        key_provider: &mut KeyProvider<K>,
    ) -> Result<Self, CreateConfigFileError> {
        if path.exists() {
            return Err(CreateConfigFileError::AlreadyExists { path });
        }
        let (outer_key, kdf_parameters) = key_provider
            .key_for_new_filesystem(OUTER_KEY_SIZE)
            .map_err(SaveConfigFileError::EncryptError)?;
        let mut result = Self {
            path,
            config,
            outer_key,
            kdf_parameters,
            access: Access::ReadWrite,
            modified: false,
        };
        result.save()?;
        Ok(result)
    }

    pub fn load<K: PasswordBasedKDF>(
        path: PathBuf,
        key_provider: &mut KeyProvider<K>,
        access: Access,
    ) -> Result<Self, LoadConfigFileError> {
        // Read the whole file up front so no file handle stays open across
        // the KDF run below, which can take seconds.
        let file_content = std::fs::read(&path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                LoadConfigFileError::ConfigFileNotFound { path: path.clone() }
            } else {
                LoadConfigFileError::Malformed(
                    anyhow::Error::from(err).context("Tried to read the config file"),
                )
            }
        })?;
        let envelope = encryption::parse(&file_content)
            .map_err(|err| LoadConfigFileError::Malformed(err.into()))?;
        let outer_key = key_provider
            .key_for_existing_filesystem(OUTER_KEY_SIZE, &envelope.kdf_parameters)
            .map_err(LoadConfigFileError::Malformed)?;
        let payload = encryption::decrypt(&envelope, &outer_key)
            .map_err(|_| LoadConfigFileError::DecryptionFailed)?;
        let config = CloakConfig::deserialize(&payload)
            .map_err(|err| LoadConfigFileError::Malformed(err.into()))?;
        let kdf_parameters = envelope.kdf_parameters;
        Ok(Self {
            path,
            config,
            outer_key,
            kdf_parameters,
            access,
            modified: false,
        })
    }

    pub fn config(&self) -> &CloakConfig {
        &self.config
    }

    /// Mutable access to the config. Marks the file as modified so the next
    /// [`CloakConfigFile::save_if_modified_and_has_readwrite_access`] call
    /// rewrites it.
    pub fn config_mut(&mut self) -> &mut CloakConfig {
        self.modified = true;
        &mut self.config
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn save_if_modified_and_has_readwrite_access(
        &mut self,
    ) -> Result<(), SaveConfigFileError> {
        if self.access == Access::ReadOnly || !self.modified {
            return Ok(());
        }
        self.save()
    }

    /// Re-wraps the descriptor under a new outer key derived from
    /// `new_key_provider` and rewrites the file. The config itself, including
    /// the inner encryption key, is unchanged.
    pub fn change_encryption_key<K: PasswordBasedKDF>(
        &mut self,
        new_key_provider: &mut KeyProvider<K>,
    ) -> Result<(), SaveConfigFileError> {
        let (outer_key, kdf_parameters) = new_key_provider
            .key_for_new_filesystem(OUTER_KEY_SIZE)
            .map_err(SaveConfigFileError::EncryptError)?;
        self.outer_key = outer_key;
        self.kdf_parameters = kdf_parameters;
        self.save()
    }

    fn save(&mut self) -> Result<(), SaveConfigFileError> {
        assert_eq!(
            Access::ReadWrite,
            self.access,
            "Tried to save a config file that was loaded read-only",
        );
        let payload = Zeroizing::new(self.config.serialize());
        let file_content = encryption::encrypt(&payload, &self.outer_key, &self.kdf_parameters)
            .context("Tried to encrypt the config")
            .map_err(SaveConfigFileError::EncryptError)?;
        write_atomically(&self.path, &file_content)?;
        self.modified = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::cloakconfig::FilesystemId;
    use super::*;
    use cloakfs_crypto::kdf::scrypt::ScryptSettings;
    use tempdir::TempDir;

    fn password_provider(password: &str) -> KeyProvider {
        KeyProvider::password_based(password.to_string(), ScryptSettings::TEST)
    }

    fn example_config() -> CloakConfig {
        CloakConfig {
            root_blob: "a5f3b6c2d4e19087a5f3b6c2d4e19087".to_string(),
            enc_key: "0123456789ABCDEF0123456789ABCDEF0123456789ABCDEF0123456789ABCDEF"
                .to_string(),
            cipher: "xchacha20-poly1305".to_string(),
            format_version: "0.10".to_string(),
            created_with_version: "0.11.0".to_string(),
            last_opened_with_version: "0.11.0".to_string(),
            blocksize_bytes: 16384,
            filesystem_id: FilesystemId::new_random(),
            exclusive_client_id: None,
        }
    }

    #[test]
    fn create_and_load() {
        let dir = TempDir::new("configfile").unwrap();
        let path = dir.path().join("cryfs.config");
        let config = example_config();
        CloakConfigFile::create_new(
            path.clone(),
            config.clone(),
            &mut password_provider("mypassword"),
        )
        .unwrap();

        let loaded = CloakConfigFile::load(
            path,
            &mut password_provider("mypassword"),
            Access::ReadWrite,
        )
        .unwrap();
        assert_eq!(&config, loaded.config());
    }

    #[test]
    fn create_fails_if_file_exists() {
        let dir = TempDir::new("configfile").unwrap();
        let path = dir.path().join("cryfs.config");
        std::fs::write(&path, b"already here").unwrap();
        let err = CloakConfigFile::create_new(
            path,
            example_config(),
            &mut password_provider("mypassword"),
        )
        .unwrap_err();
        assert!(matches!(err, CreateConfigFileError::AlreadyExists { .. }));
    }

    #[test]
    fn load_with_wrong_password_fails() {
        let dir = TempDir::new("configfile").unwrap();
        let path = dir.path().join("cryfs.config");
        CloakConfigFile::create_new(
            path.clone(),
            example_config(),
            &mut password_provider("mypassword"),
        )
        .unwrap();

        let err = CloakConfigFile::load(
            path,
            &mut password_provider("wrongpassword"),
            Access::ReadWrite,
        )
        .unwrap_err();
        assert!(matches!(err, LoadConfigFileError::DecryptionFailed));
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = TempDir::new("configfile").unwrap();
        let err = CloakConfigFile::load(
            dir.path().join("doesnt_exist"),
            &mut password_provider("mypassword"),
            Access::ReadWrite,
        )
        .unwrap_err();
        assert!(matches!(err, LoadConfigFileError::ConfigFileNotFound { .. }));
    }

    #[test]
    fn load_garbage_file_fails() {
        let dir = TempDir::new("configfile").unwrap();
        let path = dir.path().join("cryfs.config");
        std::fs::write(&path, b"this is not a config file").unwrap();
        let err = CloakConfigFile::load(
            path,
            &mut password_provider("mypassword"),
            Access::ReadWrite,
        )
        .unwrap_err();
        assert!(matches!(err, LoadConfigFileError::Malformed(_)));
    }

    #[test]
    fn save_if_modified_doesnt_write_unmodified_file() {
        let dir = TempDir::new("configfile").unwrap();
        let path = dir.path().join("cryfs.config");
        CloakConfigFile::create_new(
            path.clone(),
            example_config(),
            &mut password_provider("mypassword"),
        )
        .unwrap();
        let content_before = std::fs::read(&path).unwrap();

        let mut loaded = CloakConfigFile::load(
            path.clone(),
            &mut password_provider("mypassword"),
            Access::ReadWrite,
        )
        .unwrap();
        loaded.save_if_modified_and_has_readwrite_access().unwrap();

        // Saving re-encrypts with a fresh nonce, so if the file was written
        // its bytes would differ.
        assert_eq!(content_before, std::fs::read(&path).unwrap());
    }

    #[test]
    fn save_if_modified_writes_modified_file() {
        let dir = TempDir::new("configfile").unwrap();
        let path = dir.path().join("cryfs.config");
        CloakConfigFile::create_new(
            path.clone(),
            example_config(),
            &mut password_provider("mypassword"),
        )
        .unwrap();

        let mut loaded = CloakConfigFile::load(
            path.clone(),
            &mut password_provider("mypassword"),
            Access::ReadWrite,
        )
        .unwrap();
        loaded.config_mut().last_opened_with_version = "0.12.0".to_string();
        loaded.save_if_modified_and_has_readwrite_access().unwrap();

        let reloaded = CloakConfigFile::load(
            path,
            &mut password_provider("mypassword"),
            Access::ReadWrite,
        )
        .unwrap();
        assert_eq!("0.12.0", reloaded.config().last_opened_with_version);
    }

    #[test]
    fn save_if_modified_doesnt_write_readonly_file() {
        let dir = TempDir::new("configfile").unwrap();
        let path = dir.path().join("cryfs.config");
        CloakConfigFile::create_new(
            path.clone(),
            example_config(),
            &mut password_provider("mypassword"),
        )
        .unwrap();
        let content_before = std::fs::read(&path).unwrap();

        let mut loaded = CloakConfigFile::load(
            path.clone(),
            &mut password_provider("mypassword"),
            Access::ReadOnly,
        )
        .unwrap();
        loaded.config_mut().last_opened_with_version = "0.12.0".to_string();
        loaded.save_if_modified_and_has_readwrite_access().unwrap();

        assert_eq!(content_before, std::fs::read(&path).unwrap());
    }

    #[test]
    fn change_encryption_key_keeps_config_and_changes_password() {
        let dir = TempDir::new("configfile").unwrap();
        let path = dir.path().join("cryfs.config");
        let config = example_config();
        let mut file = CloakConfigFile::create_new(
            path.clone(),
            config.clone(),
            &mut password_provider("oldpassword"),
        )
        .unwrap();

        file.change_encryption_key(&mut password_provider("newpassword"))
            .unwrap();

        CloakConfigFile::load(
            path.clone(),
            &mut password_provider("oldpassword"),
            Access::ReadWrite,
        )
        .unwrap_err();
        let reloaded = CloakConfigFile::load(
            path,
            &mut password_provider("newpassword"),
            Access::ReadWrite,
        )
        .unwrap();
        assert_eq!(&config, reloaded.config());
    }

    #[test]
    fn load_with_direct_key_provider() {
        let dir = TempDir::new("configfile").unwrap();
        let path = dir.path().join("cryfs.config");
        let derived_key = std::sync::Arc::new(std::sync::Mutex::new(None));
        let config = example_config();
        {
            let derived_key = std::sync::Arc::clone(&derived_key);
            let mut provider = password_provider("mypassword").with_derived_key_sink(Box::new(
                move |key_bytes| {
                    *derived_key.lock().unwrap() = Some(hex::encode_upper(key_bytes));
                },
            ));
            CloakConfigFile::create_new(path.clone(), config.clone(), &mut provider).unwrap();
        }

        let derived_key = derived_key.lock().unwrap().clone().unwrap();
        let key = EncryptionKey::from_hex(&derived_key).unwrap();
        let loaded = CloakConfigFile::load(
            path,
            &mut KeyProvider::<cloakfs_crypto::kdf::scrypt::Scrypt>::direct(key),
            Access::ReadWrite,
        )
        .unwrap();
        assert_eq!(&config, loaded.config());
    }
}
