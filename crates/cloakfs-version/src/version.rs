use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::cmp::{Ord, Ordering, PartialOrd};
use std::fmt::{self, Debug, Display, Formatter};
use std::num::ParseIntError;

/// A semantic version with major, minor, patch, and optional prerelease components.
///
/// The generic parameter `P` is the string type used for the prerelease
/// identifier, usually `&str` for borrowed versions (e.g. compile-time
/// constants) or `String` for versions parsed from a config descriptor.
///
/// Versions are ordered by major, then minor, then patch; a prerelease is
/// considered less than the corresponding stable release
/// (`1.0.0-alpha < 1.0.0`). Missing minor/patch components parse as zero,
/// so `0.10` and `0.10.0` are equal.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct Version<P>
where
    P: Borrow<str>,
{
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub prerelease: Option<P>,
}

impl<P> Debug for Version<P>
where
    P: Borrow<str>,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl<P> Display for Version<P>
where
    P: Borrow<str>,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(prerelease) = &self.prerelease {
            write!(f, "-{}", prerelease.borrow())?;
        }
        Ok(())
    }
}

impl<P> Eq for Version<P> where P: Borrow<str> + Eq {}

impl<P1, P2> PartialEq<Version<P2>> for Version<P1>
where
    P1: Borrow<str>,
    P2: Borrow<str>,
{
    fn eq(&self, other: &Version<P2>) -> bool {
        self.major == other.major
            && self.minor == other.minor
            && self.patch == other.patch
            && match (&self.prerelease, &other.prerelease) {
                (Some(lhs), Some(rhs)) => lhs.borrow() == rhs.borrow(),
                (None, None) => true,
                _ => false,
            }
    }
}

impl<P> Ord for Version<P>
where
    P: Borrow<str> + Eq,
{
    fn cmp(&self, other: &Version<P>) -> Ordering {
        version_cmp(self, other)
    }
}

impl<P1, P2> PartialOrd<Version<P2>> for Version<P1>
where
    P1: Borrow<str>,
    P2: Borrow<str>,
{
    fn partial_cmp(&self, other: &Version<P2>) -> Option<Ordering> {
        Some(version_cmp(self, other))
    }
}

fn version_cmp<P1, P2>(lhs: &Version<P1>, rhs: &Version<P2>) -> Ordering
where
    P1: Borrow<str>,
    P2: Borrow<str>,
{
    if lhs.major != rhs.major {
        return lhs.major.cmp(&rhs.major);
    }
    if lhs.minor != rhs.minor {
        return lhs.minor.cmp(&rhs.minor);
    }
    if lhs.patch != rhs.patch {
        return lhs.patch.cmp(&rhs.patch);
    }
    match (&lhs.prerelease, &rhs.prerelease) {
        (Some(lhs), Some(rhs)) => lhs.borrow().cmp(rhs.borrow()),
        (None, None) => Ordering::Equal,
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
    }
}

impl<'a> Version<&'a str> {
    /// Parses a version string in the format `major[.minor[.patch]][-prerelease]`.
    pub fn parse(version: &'a str) -> Result<Self, ParseVersionError<'a>> {
        let (major_minor_patch, prerelease) = match version.split_once('-') {
            Some((major_minor_patch, prerelease)) => (major_minor_patch, Some(prerelease)),
            None => (version, None),
        };
        let (major, minor_patch) = match major_minor_patch.split_once('.') {
            Some((major, minor_patch)) => (major, minor_patch),
            None => (major_minor_patch, "0"),
        };
        let (minor, patch) = match minor_patch.split_once('.') {
            Some((minor, patch)) => (minor, patch),
            None => (minor_patch, "0"),
        };

        match (major.parse(), minor.parse(), patch.parse()) {
            (Ok(major), Ok(minor), Ok(patch)) => Ok(Self {
                major,
                minor,
                patch,
                prerelease,
            }),
            (Err(error), _, _) | (_, Err(error), _) | (_, _, Err(error)) => {
                Err(ParseVersionError { version, error })
            }
        }
    }

    /// Parses a version string at compile time.
    ///
    /// This is a `const fn` version of [`Self::parse`] with a simpler error
    /// type because const fns have limited support for complex error types.
    ///
    /// ```
    /// use cloakfs_version::Version;
    ///
    /// const VERSION: Version<&str> = match Version::parse_const("1.2.3") {
    ///     Ok(v) => v,
    ///     Err(_) => panic!("Invalid version"),
    /// };
    /// assert_eq!(VERSION.major, 1);
    /// ```
    // TODO Merge this with [Self::parse] once const support is good enough
    pub const fn parse_const(version: &'a str) -> Result<Self, ParseIntError> {
        use konst::string;
        let (major_minor_patch, prerelease) = match string::split_once(version, '-') {
            Some((major_minor_patch, prerelease)) => (major_minor_patch, Some(prerelease)),
            None => (version, None),
        };
        let (major, minor_patch) = match string::split_once(major_minor_patch, '.') {
            Some((major, minor_patch)) => (major, minor_patch),
            None => (major_minor_patch, "0"),
        };
        let (minor, patch) = match string::split_once(minor_patch, '.') {
            Some((minor, patch)) => (minor, patch),
            None => (minor_patch, "0"),
        };

        match (
            u32::from_str_radix(major, 10),
            u32::from_str_radix(minor, 10),
            u32::from_str_radix(patch, 10),
        ) {
            (Ok(major), Ok(minor), Ok(patch)) => Ok(Self {
                major,
                minor,
                patch,
                prerelease,
            }),
            (Err(err), _, _) | (_, Err(err), _) | (_, _, Err(err)) => Err(err),
        }
    }

    /// Creates a [`Version<String>`] with owned copies of all string data.
    pub fn to_owned(&self) -> Version<String> {
        Version {
            major: self.major,
            minor: self.minor,
            patch: self.patch,
            prerelease: self.prerelease.map(|s| s.to_owned()),
        }
    }
}

impl Version<String> {
    /// Creates a [`Version<&str>`] borrowing the string data from this version.
    pub fn to_borrowed(&self) -> Version<&str> {
        Version {
            major: self.major,
            minor: self.minor,
            patch: self.patch,
            prerelease: self.prerelease.as_ref().map(String::borrow),
        }
    }
}

/// Error returned when parsing a version string fails, i.e. when the
/// major, minor or patch component isn't a valid number.
#[derive(Error, Display, Debug, PartialEq, Eq)]
#[display("Failed to parse version `{version}`: {error}")]
pub struct ParseVersionError<'a> {
    version: &'a str,
    #[error(source)]
    error: std::num::ParseIntError,
}
