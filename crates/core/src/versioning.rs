//! Version string parsing and incrementing.
//!
//! Versions are two or more dot-separated non-negative integers
//! (`1.0.0`, `2.3`, `1.0.0.12`). Every captured snapshot bumps the last
//! component by one; higher components never change and there is no carry,
//! so `1.0.9` is followed by `1.0.10`. Comparison is numeric per component,
//! never lexical.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Version assigned to the first snapshot of every new parent.
pub const INITIAL_VERSION: &str = "1.0.0";

/// Total attempts for a mutation that keeps losing the optimistic check.
pub const MAX_CAPTURE_ATTEMPTS: u32 = 3;

/// Two or more dot-separated runs of digits, nothing else.
pub const VERSION_PATTERN: &str = r"^\d+(\.\d+)+$";

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(VERSION_PATTERN).expect("valid regex"));

/// A parsed version string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    components: Vec<u64>,
}

impl Version {
    pub fn components(&self) -> &[u64] {
        &self.components
    }

    /// The version that follows this one: last component plus one.
    pub fn bumped(&self) -> Result<Version, CoreError> {
        let mut components = self.components.clone();
        let last = components
            .last_mut()
            .ok_or_else(|| CoreError::InvalidVersionFormat(self.to_string()))?;
        *last = last
            .checked_add(1)
            .ok_or_else(|| CoreError::InvalidVersionFormat(self.to_string()))?;
        Ok(Version { components })
    }
}

impl FromStr for Version {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !VERSION_RE.is_match(s) {
            return Err(CoreError::InvalidVersionFormat(s.to_string()));
        }
        let components = s
            .split('.')
            .map(|part| part.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| CoreError::InvalidVersionFormat(s.to_string()))?;
        Ok(Version { components })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components.cmp(&other.components)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Increment the last component of a version string.
pub fn bump(version: &str) -> Result<String, CoreError> {
    Ok(version.parse::<Version>()?.bumped()?.to_string())
}

/// Version for the next snapshot of a parent whose live version is `current`.
///
/// A parent without a live version has never been captured and receives
/// [`INITIAL_VERSION`].
pub fn next_version(current: Option<&str>) -> Result<String, CoreError> {
    match current {
        None => Ok(INITIAL_VERSION.to_string()),
        Some(v) => bump(v),
    }
}

/// Numeric comparison of two version strings.
pub fn compare(a: &str, b: &str) -> Result<Ordering, CoreError> {
    Ok(a.parse::<Version>()?.cmp(&b.parse::<Version>()?))
}
