use std::process::ExitCode;

/// Stable error codes surfaced at the process boundary.
///
/// Frontends (CLI, FFI) map these to exit codes via [`ErrorCode::exit_code`].
/// The numeric values are part of the external contract and must not change
/// between releases; scripts depend on them.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ErrorCode {
    /// No error happened, everything is ok
    Success,

    /// An error happened that doesn't have an error code associated with it
    UnspecifiedError,

    /// The config descriptor is missing or malformed
    InvalidFilesystem,

    /// Decrypting the config descriptor failed. Either the credential is
    /// wrong or the descriptor is corrupted.
    WrongCredential,

    /// The filesystem format is older than the minimum supported format
    TooOldFormat,

    /// The filesystem format is newer than this version supports
    TooNewFormat,

    /// The filesystem needs a format upgrade but upgrading wasn't allowed
    UpgradeRequired,

    /// The filesystem uses a different cipher than the one requested on the
    /// command line
    CipherMismatch,

    /// The command line and the filesystem disagree on whether missing blocks
    /// should be treated as integrity violations
    IntegritySetupMismatch,

    /// The filesystem is in single-client mode and pinned to a different client
    SingleClientViolation,

    /// The basedir now holds a filesystem with a different filesystem id than
    /// the last time it was loaded. An attacker may have replaced it.
    FilesystemIdChanged,

    /// The filesystem encryption key differs from the last time this
    /// filesystem was loaded. An attacker may have replaced it.
    EncryptionKeyChanged,

    /// The block layer detected an integrity violation
    IntegrityViolation,
}

impl ErrorCode {
    /// Exit code to report to the shell
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(match self {
            Self::Success => 0,
            Self::UnspecifiedError => 1,
            Self::InvalidFilesystem => 10,
            Self::WrongCredential => 11,
            Self::TooOldFormat => 12,
            Self::TooNewFormat => 13,
            Self::UpgradeRequired => 14,
            Self::CipherMismatch => 15,
            Self::IntegritySetupMismatch => 16,
            Self::SingleClientViolation => 17,
            Self::FilesystemIdChanged => 18,
            Self::EncryptionKeyChanged => 19,
            Self::IntegrityViolation => 20,
        })
    }
}
