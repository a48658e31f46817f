//! Package version parsing and comparison
//!
//! Catalog versions follow the NuGet flavour of semantic versioning: one to
//! four numeric parts, an optional `-label` and optional `+metadata`.
//! Equality and ordering use the normalized value, so `1.0`, `1.0.0` and
//! `1.0.0.0` are the same version and metadata never takes part.

use semver::{BuildMetadata, Prerelease};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// Reason a version string was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct ParseVersionError {
    reason: String,
}

impl ParseVersionError {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A parsed package version
#[derive(Debug, Clone)]
pub struct PackageVersion {
    major: u64,
    minor: u64,
    patch: u64,
    revision: u64,
    /// Release label as written
    label: Prerelease,
    /// Lowercased label, used for comparison
    label_key: Prerelease,
    metadata: BuildMetadata,
}

impl PackageVersion {
    /// Create a stable version with three numeric parts
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            revision: 0,
            label: Prerelease::EMPTY,
            label_key: Prerelease::EMPTY,
            metadata: BuildMetadata::EMPTY,
        }
    }

    /// Parse a version string
    pub fn parse(input: &str) -> Result<Self, ParseVersionError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseVersionError::new("empty version"));
        }

        let (rest, metadata) = match input.split_once('+') {
            Some((_, "")) => return Err(ParseVersionError::new("empty metadata")),
            Some((rest, meta)) => {
                let metadata = BuildMetadata::new(meta)
                    .map_err(|e| ParseVersionError::new(format!("invalid metadata: {e}")))?;
                (rest, metadata)
            }
            None => (input, BuildMetadata::EMPTY),
        };

        let (numbers, label) = match rest.split_once('-') {
            Some((_, "")) => return Err(ParseVersionError::new("empty release label")),
            Some((numbers, label)) => {
                let label = Prerelease::new(label)
                    .map_err(|e| ParseVersionError::new(format!("invalid release label: {e}")))?;
                (numbers, label)
            }
            None => (rest, Prerelease::EMPTY),
        };

        let parts = numbers
            .split('.')
            .map(parse_numeric_part)
            .collect::<Result<Vec<u64>, _>>()?;

        if parts.len() > 4 {
            return Err(ParseVersionError::new(format!(
                "expected at most 4 numeric parts, found {}",
                parts.len()
            )));
        }

        let part = |i: usize| parts.get(i).copied().unwrap_or(0);
        let label_key = lowercase_label(&label)?;

        Ok(Self {
            major: part(0),
            minor: part(1),
            patch: part(2),
            revision: part(3),
            label,
            label_key,
            metadata,
        })
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn patch(&self) -> u64 {
        self.patch
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Release label, empty for stable versions
    pub fn release_label(&self) -> &str {
        self.label.as_str()
    }

    /// Whether the version carries a release label
    pub fn is_prerelease(&self) -> bool {
        !self.label.is_empty()
    }

    /// `major.minor.patch[.revision][-label]`, without metadata
    pub fn to_normalized_string(&self) -> String {
        let mut out = format!("{}.{}.{}", self.major, self.minor, self.patch);
        if self.revision > 0 {
            out.push_str(&format!(".{}", self.revision));
        }
        if !self.label.is_empty() {
            out.push('-');
            out.push_str(self.label.as_str());
        }
        out
    }
}

fn parse_numeric_part(part: &str) -> Result<u64, ParseVersionError> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseVersionError::new(format!(
            "invalid numeric part '{part}'"
        )));
    }
    part.parse::<u64>()
        .map_err(|_| ParseVersionError::new(format!("numeric part '{part}' is out of range")))
}

fn lowercase_label(label: &Prerelease) -> Result<Prerelease, ParseVersionError> {
    if label.is_empty() {
        return Ok(Prerelease::EMPTY);
    }
    Prerelease::new(&label.as_str().to_ascii_lowercase())
        .map_err(|e| ParseVersionError::new(format!("invalid release label: {e}")))
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PackageVersion {}

impl Hash for PackageVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.major.hash(state);
        self.minor.hash(state);
        self.patch.hash(state);
        self.revision.hash(state);
        self.label_key.hash(state);
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch, self.revision)
            .cmp(&(other.major, other.minor, other.patch, other.revision))
            .then_with(|| self.label_key.cmp(&other.label_key))
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for PackageVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_normalized_string())?;
        if !self.metadata.is_empty() {
            write!(f, "+{}", self.metadata)?;
        }
        Ok(())
    }
}

impl Serialize for PackageVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_normalized_string())
    }
}

impl<'de> Deserialize<'de> for PackageVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
