// Device firmware / API version handling
//
// The switch reports its Fabric OS release at login (`9.1.0b`, `v8.2.1c`).
// Releases compare numerically on major.minor.patch, then by the letter
// suffix, so `8.2.1c` > `8.2.1` > `8.2.0d`.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Oldest release whose REST dialect this driver speaks.
pub const MINIMUM_SUPPORTED: FosVersion = FosVersion::new(8, 2, 1, "c");

/// A parsed Fabric OS release.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FosVersion {
    major: u16,
    minor: u16,
    patch: u16,
    /// Release letter(s) after the patch number. Empty sorts first.
    suffix: Cow<'static, str>,
}

impl FosVersion {
    pub const fn new(major: u16, minor: u16, patch: u16, suffix: &'static str) -> Self {
        Self {
            major,
            minor,
            patch,
            suffix: Cow::Borrowed(suffix),
        }
    }

    pub fn major(&self) -> u16 {
        self.major
    }

    pub fn minor(&self) -> u16 {
        self.minor
    }

    pub fn patch(&self) -> u16 {
        self.patch
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Root path segment every request URI starts with.
    ///
    /// All supported releases serve the RESTCONF tree under `/rest`.
    pub fn api_root(&self) -> &'static str {
        "/rest"
    }

    /// Whether this release is at or above `minimum`.
    pub fn supports(&self, minimum: &FosVersion) -> bool {
        self >= minimum
    }
}

impl fmt::Display for FosVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}{}",
            self.major,
            self.minor,
            self.patch,
            self.suffix()
        )
    }
}

/// Error returned when a release string can't be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid Fabric OS version '{0}'")]
pub struct ParseVersionError(pub String);

impl FromStr for FosVersion {
    type Err = ParseVersionError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let err = || ParseVersionError(raw.to_owned());
        let trimmed = raw.trim();
        let body = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        let mut parts = body.splitn(3, '.');
        let major = parts.next().ok_or_else(err)?.parse().map_err(|_| err())?;
        let minor = parts.next().ok_or_else(err)?.parse().map_err(|_| err())?;
        let last = parts.next().unwrap_or("0");

        let digits_end = last
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(last.len());
        let (patch, suffix) = last.split_at(digits_end);
        let patch = if patch.is_empty() {
            return Err(err());
        } else {
            patch.parse().map_err(|_| err())?
        };
        if !suffix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(err());
        }

        Ok(Self {
            major,
            minor,
            patch,
            suffix: Cow::Owned(suffix.to_ascii_lowercase()),
        })
    }
}

impl Serialize for FosVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FosVersion {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
