//! Per-machine local state.
//!
//! Local state binds a filesystem to the machine that uses it: which client
//! id we have in each filesystem, a fingerprint of each filesystem's
//! encryption key, and which filesystem id lives in which basedir. An
//! adversary controlling the basedir can't forge any of this, which is what
//! lets us detect a filesystem being swapped out underneath us.

mod basedir_metadata;
mod client_id;
mod filesystem_metadata;
mod local_state_dir;

pub use basedir_metadata::{BasedirMetadata, CheckFilesystemIdError};
pub use client_id::ClientId;
pub use filesystem_metadata::{FilesystemMetadata, FilesystemMetadataError};
pub use local_state_dir::LocalStateDir;
