// src/version/mod.rs

//! Version parsing and ordering for release tags.
//!
//! Release tags come in as `v1.2.3`, `1.2.3`, or a JSON-quoted form like
//! `"1.2.3"`. Comparison is lexicographic over (major, minor, patch), and
//! "later" is strict: a version is never later than itself.

use crate::error::{Error, Result};
use semver::Version;
use std::cmp::Ordering;
use std::fmt;

/// A release version as a (major, minor, patch) triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionData {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl VersionData {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a release tag into a version triple.
    ///
    /// Tolerates surrounding double quotes and one leading `v`:
    /// - "1.2.3" → (1, 2, 3)
    /// - "v1.2.3" → (1, 2, 3)
    /// - "\"1.2.3\"" → (1, 2, 3)
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix('"').unwrap_or(trimmed);
        let trimmed = trimmed.strip_suffix('"').unwrap_or(trimmed);
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);

        let version = Version::parse(trimmed)
            .map_err(|e| Error::VersionError(format!("'{}': {}", s, e)))?;

        Ok(Self {
            major: version.major,
            minor: version.minor,
            patch: version.patch,
        })
    }

    /// The version compiled into this binary.
    pub fn current() -> Result<Self> {
        Self::parse(env!("CARGO_PKG_VERSION"))
    }

    /// Strictly later than `other`. Equal versions are never later.
    pub fn is_later(&self, other: &VersionData) -> bool {
        self.cmp(other) == Ordering::Greater
    }
}

impl fmt::Display for VersionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain() {
        let v = VersionData::parse("1.2.3").unwrap();
        assert_eq!(v, VersionData::new(1, 2, 3));
    }

    #[test]
    fn test_parse_v_prefix() {
        let v = VersionData::parse("v2.10.0").unwrap();
        assert_eq!(v, VersionData::new(2, 10, 0));
    }

    #[test]
    fn test_parse_quoted() {
        let v = VersionData::parse("\"1.2.3\"").unwrap();
        assert_eq!(v, VersionData::new(1, 2, 3));

        let v = VersionData::parse("\"v1.2.3\"").unwrap();
        assert_eq!(v, VersionData::new(1, 2, 3));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(VersionData::parse("not-a-version").is_err());
        assert!(VersionData::parse("").is_err());
        assert!(VersionData::parse("1.2").is_err());
    }

    #[test]
    fn test_is_later_major_wins() {
        let newer = VersionData::new(2, 0, 0);
        let older = VersionData::new(1, 9, 9);
        assert!(newer.is_later(&older));
        assert!(!older.is_later(&newer));
    }

    #[test]
    fn test_is_later_equal_is_false() {
        let v = VersionData::new(1, 2, 3);
        assert!(!v.is_later(&v));
    }

    #[test]
    fn test_is_later_patch() {
        let older = VersionData::new(1, 2, 3);
        let newer = VersionData::new(1, 2, 4);
        assert!(!older.is_later(&newer));
        assert!(newer.is_later(&older));
    }

    #[test]
    fn test_is_later_minor() {
        let older = VersionData::new(1, 2, 9);
        let newer = VersionData::new(1, 3, 0);
        assert!(newer.is_later(&older));
        assert!(!older.is_later(&newer));
    }

    #[test]
    fn test_display_round_trip() {
        let v = VersionData::new(0, 4, 12);
        assert_eq!(v.to_string(), "0.4.12");
        assert_eq!(VersionData::parse(&v.to_string()).unwrap(), v);
    }

    #[test]
    fn test_current_parses() {
        assert!(VersionData::current().is_ok());
    }
}
