//! Catalog entry model
//!
//! An entry is one event in the catalog: an add, edit or delete of a
//! specific package id and version. Identity is the id (case-insensitive)
//! plus the normalized version. Commit metadata only orders entries.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};
use url::Url;

use super::version::PackageVersion;

/// `@type` value of a package add or edit event
pub const PACKAGE_DETAILS_TYPE: &str = "nuget:PackageDetails";

/// `@type` value of a package delete event
pub const PACKAGE_DELETE_TYPE: &str = "nuget:PackageDelete";

/// One event from a catalog page
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    uri: Url,
    types: Vec<String>,
    id: String,
    version: PackageVersion,
    commit_id: String,
    commit_timestamp: DateTime<Utc>,
}

/// Deduplication key of an entry: lowercased id plus version
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey {
    id: String,
    version: PackageVersion,
}

impl EntryKey {
    pub fn new(id: &str, version: PackageVersion) -> Self {
        Self {
            id: id.to_lowercase(),
            version,
        }
    }

    /// Lowercased package id
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &PackageVersion {
        &self.version
    }
}

impl CatalogEntry {
    pub fn new(
        uri: Url,
        types: Vec<String>,
        commit_id: impl Into<String>,
        commit_timestamp: DateTime<Utc>,
        id: impl Into<String>,
        version: PackageVersion,
    ) -> Self {
        Self {
            uri,
            types,
            id: id.into(),
            version,
            commit_id: commit_id.into(),
            commit_timestamp,
        }
    }

    /// Location of the event document
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// Event types (`@type`)
    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// Package id as published
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &PackageVersion {
        &self.version
    }

    pub fn commit_id(&self) -> &str {
        &self.commit_id
    }

    pub fn commit_timestamp(&self) -> DateTime<Utc> {
        self.commit_timestamp
    }

    /// Identity used for deduplication
    pub fn key(&self) -> EntryKey {
        EntryKey::new(&self.id, self.version.clone())
    }

    /// Whether this event removes the package version
    pub fn is_delete(&self) -> bool {
        self.types.iter().any(|t| t == PACKAGE_DELETE_TYPE)
    }

    /// Whether this event publishes or edits the package version
    pub fn is_add_or_update(&self) -> bool {
        self.types.iter().any(|t| t == PACKAGE_DETAILS_TYPE)
    }
}

impl PartialEq for CatalogEntry {
    fn eq(&self, other: &Self) -> bool {
        self.id.to_lowercase() == other.id.to_lowercase() && self.version == other.version
    }
}

impl Eq for CatalogEntry {}

impl Hash for CatalogEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.to_lowercase().hash(state);
        self.version.hash(state);
    }
}

impl fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} Date: {}",
            self.id,
            self.version,
            self.commit_timestamp
                .to_rfc3339_opts(SecondsFormat::AutoSi, true)
        )
    }
}

/// Parse a commit timestamp strictly as RFC 3339
///
/// An explicit offset is required; local-time guessing is never applied.
pub fn parse_commit_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
