use crate::errors::{Result, SnapshotError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A platform release version as recorded in snapshot metadata.
///
/// Versions follow the release naming scheme `YYYY.MM` with an optional
/// patch component (`2024.04`, `2024.04.02`). Ordering is numeric and
/// component-wise; a missing patch component compares as patch 0, so
/// `2024.04` < `2024.04.01` < `2024.07`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlatformVersion {
    year: u16,
    month: u8,
    patch: u8,
    raw: String,
}

impl PlatformVersion {
    /// Parse a version string. Fails with `InvalidSnapshotFormat` on
    /// anything that is not `YYYY.MM` or `YYYY.MM.PP`.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = || SnapshotError::InvalidSnapshotFormat {
            reason: format!("invalid version string: {:?}", raw),
        };

        let parts: Vec<&str> = raw.split('.').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(invalid());
        }
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid());
        }

        let year: u16 = parts[0].parse().map_err(|_| invalid())?;
        let month: u8 = parts[1].parse().map_err(|_| invalid())?;
        let patch: u8 = match parts.get(2) {
            Some(p) => p.parse().map_err(|_| invalid())?,
            None => 0,
        };

        Ok(Self {
            year,
            month,
            patch,
            raw: raw.to_string(),
        })
    }

    /// The version string exactly as recorded
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for PlatformVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for PlatformVersion {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PlatformVersion {
    type Error = SnapshotError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<PlatformVersion> for String {
    fn from(v: PlatformVersion) -> String {
        v.raw
    }
}

// Equality and ordering ignore the raw string: "2024.04" == "2024.4".
impl PartialEq for PlatformVersion {
    fn eq(&self, other: &Self) -> bool {
        (self.year, self.month, self.patch) == (other.year, other.month, other.patch)
    }
}

impl Eq for PlatformVersion {}

impl PartialOrd for PlatformVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PlatformVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.year, self.month, self.patch).cmp(&(other.year, other.month, other.patch))
    }
}

impl std::hash::Hash for PlatformVersion {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (self.year, self.month, self.patch).hash(state);
    }
}
