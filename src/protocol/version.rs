//! Client version used to select wire layouts

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid client version '{0}': expected a.b.c[.d] with each part 0-255")]
pub struct VersionParseError(String);

/// Packed client version (`major.minor.revision.prototype`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientVersion(u32);

impl ClientVersion {
    pub const MIN: ClientVersion = ClientVersion(0);

    /// First client that receives 32-bit feature flags
    pub const V6_0_14_2: ClientVersion = ClientVersion::new(6, 0, 14, 2);

    pub const fn new(major: u8, minor: u8, revision: u8, prototype: u8) -> Self {
        Self(
            ((major as u32) << 24)
                | ((minor as u32) << 16)
                | ((revision as u32) << 8)
                | prototype as u32,
        )
    }

    pub fn parts(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl Default for ClientVersion {
    fn default() -> Self {
        ClientVersion::new(7, 0, 95, 0)
    }
}

impl fmt::Display for ClientVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [major, minor, revision, prototype] = self.parts();
        write!(f, "{}.{}.{}.{}", major, minor, revision, prototype)
    }
}

impl FromStr for ClientVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .trim()
            .split('.')
            .map(|p| p.parse::<u8>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| VersionParseError(s.to_string()))?;

        match parts.as_slice() {
            [major, minor, revision] => Ok(Self::new(*major, *minor, *revision, 0)),
            [major, minor, revision, prototype] => {
                Ok(Self::new(*major, *minor, *revision, *prototype))
            }
            _ => Err(VersionParseError(s.to_string())),
        }
    }
}

impl TryFrom<String> for ClientVersion {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClientVersion> for String {
    fn from(version: ClientVersion) -> Self {
        version.to_string()
    }
}
