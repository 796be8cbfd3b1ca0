mod cloakconfig;
mod filesystem_id;
mod serialization;

pub use cloakconfig::{
    ALLOWED_BLOCKSIZES, CloakConfig, DEFAULT_CONFIG_FILE_NAME, FILESYSTEM_FORMAT_VERSION,
};
pub use filesystem_id::FilesystemId;
pub use serialization::DeserializationError;
