pub mod ciphers;
mod cloakconfig;
mod configfile;
mod creator;
mod encryption;
mod key_provider;
mod loader;

pub use ciphers::ALL_CIPHERS;
pub use cloakconfig::{
    ALLOWED_BLOCKSIZES, CloakConfig, DEFAULT_CONFIG_FILE_NAME, DeserializationError,
    FILESYSTEM_FORMAT_VERSION, FilesystemId,
};
pub use configfile::{
    Access, CloakConfigFile, CreateConfigFileError, LoadConfigFileError, SaveConfigFileError,
};
pub use creator::{ConfigCreateError, DEFAULT_BLOCKSIZE_BYTES, DEFAULT_CIPHER};
pub use key_provider::{DerivedKeySink, KeyProvider};
pub use loader::{
    CLOAKFS_VERSION, CommandLineFlags, ConfigLoadError, ConfigLoadResult, LoadFlags,
    change_encryption_key, load_or_create, load_readonly,
};
