#![forbid(unsafe_code)]

//! Semantic version handling for cloakfs.
//!
//! The filesystem format version and the version that created a filesystem are
//! both stored in the config descriptor and compared against each other during
//! load, so we need a version type that can be parsed at compile time and
//! ordered correctly (e.g. `0.9.6 < 0.10`).

mod version;
pub use version::{ParseVersionError, Version};

// Re-exported for use by the `cargo_version!` macro, not part of the public API.
#[doc(hidden)]
pub use konst;

/// Returns a [`Version`] parsed from the calling crate's `Cargo.toml`.
///
/// This reads the `CARGO_PKG_VERSION_*` environment variables at compile time,
/// so it has to be a macro: a const in this crate would report the version of
/// `cloakfs-version` instead of the version of the calling crate.
#[macro_export]
macro_rules! cargo_version {
    () => {{
        {
            const RESULT: $crate::Version<&'static str> = $crate::Version {
                major: $crate::konst::unwrap_ctx!($crate::konst::primitive::parse_u32(env!(
                    "CARGO_PKG_VERSION_MAJOR"
                ))),
                minor: $crate::konst::unwrap_ctx!($crate::konst::primitive::parse_u32(env!(
                    "CARGO_PKG_VERSION_MINOR"
                ))),
                patch: $crate::konst::unwrap_ctx!($crate::konst::primitive::parse_u32(env!(
                    "CARGO_PKG_VERSION_PATCH"
                ))),
                prerelease: {
                    let prerelease = env!("CARGO_PKG_VERSION_PRE");
                    if prerelease.is_empty() {
                        None
                    } else {
                        Some(prerelease)
                    }
                },
            };
            RESULT
        }
    }};
}
