//! Package set: id to versions index over rolled-up entries

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::entry::CatalogEntry;
use super::version::PackageVersion;

/// Versions known for one package id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageVersions {
    /// Id as written by the most recent entry
    pub id: String,
    pub versions: BTreeSet<PackageVersion>,
}

/// Existing packages and their versions, keyed case-insensitively by id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageSet {
    packages: BTreeMap<String, PackageVersions>,
}

impl PackageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from rolled-up entries, newest first
    ///
    /// Every id/version in the rollup is included, whatever its latest event.
    pub fn from_rolled_up(entries: &[CatalogEntry]) -> Self {
        Self::from_entries(entries.iter())
    }

    /// Build from rolled-up entries, leaving out id/versions whose latest
    /// event is a delete
    pub fn existing_from_rolled_up(entries: &[CatalogEntry]) -> Self {
        Self::from_entries(entries.iter().filter(|e| !e.is_delete()))
    }

    fn from_entries<'a>(entries: impl Iterator<Item = &'a CatalogEntry>) -> Self {
        let mut set = Self::new();
        for entry in entries {
            set.insert(entry.id(), entry.version().clone());
        }
        set
    }

    pub fn insert(&mut self, id: &str, version: PackageVersion) -> bool {
        self.packages
            .entry(id.to_lowercase())
            .or_insert_with(|| PackageVersions {
                id: id.to_string(),
                versions: BTreeSet::new(),
            })
            .versions
            .insert(version)
    }

    /// Versions of `id`, lowest first
    pub fn get(&self, id: &str) -> Option<&BTreeSet<PackageVersion>> {
        self.packages.get(&id.to_lowercase()).map(|p| &p.versions)
    }

    pub fn contains(&self, id: &str, version: &PackageVersion) -> bool {
        self.get(id).is_some_and(|versions| versions.contains(version))
    }

    /// Number of distinct package ids
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Total number of id/version pairs
    pub fn version_count(&self) -> usize {
        self.packages.values().map(|p| p.versions.len()).sum()
    }

    /// Packages ordered by lowercased id
    pub fn iter(&self) -> impl Iterator<Item = &PackageVersions> {
        self.packages.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::entry::{PACKAGE_DELETE_TYPE, PACKAGE_DETAILS_TYPE};
    use crate::catalog::rollup;
    use chrono::{TimeZone, Utc};
    use url::Url;

    fn entry(id: &str, version: &str, seconds: i64, kind: &str) -> CatalogEntry {
        CatalogEntry::new(
            Url::parse("https://example.org/data/entry.json").unwrap(),
            vec![kind.to_string()],
            "commit",
            Utc.timestamp_opt(seconds, 0).unwrap(),
            id,
            PackageVersion::parse(version).unwrap(),
        )
    }

    #[test]
    fn test_groups_versions_case_insensitively() {
        let rolled = rollup(vec![
            entry("Newtonsoft.Json", "9.0.1", 3, PACKAGE_DETAILS_TYPE),
            entry("newtonsoft.json", "6.0.8", 2, PACKAGE_DETAILS_TYPE),
            entry("xunit", "2.1.0", 1, PACKAGE_DETAILS_TYPE),
        ]);

        let set = PackageSet::from_rolled_up(&rolled);
        assert_eq!(set.len(), 2);
        assert_eq!(set.version_count(), 3);

        let versions: Vec<String> = set
            .get("NEWTONSOFT.JSON")
            .unwrap()
            .iter()
            .map(PackageVersion::to_normalized_string)
            .collect();
        assert_eq!(versions, vec!["6.0.8", "9.0.1"]);
    }

    #[test]
    fn test_deleted_versions_kept() {
        let rolled = rollup(vec![
            entry("pkg", "1.0.0", 1, PACKAGE_DETAILS_TYPE),
            entry("pkg", "1.0.0", 5, PACKAGE_DELETE_TYPE),
            entry("pkg", "2.0.0", 2, PACKAGE_DETAILS_TYPE),
        ]);

        let set = PackageSet::from_rolled_up(&rolled);
        assert_eq!(set.version_count(), 2);
        assert!(set.contains("pkg", &PackageVersion::parse("1.0.0").unwrap()));
        assert!(set.contains("Pkg", &PackageVersion::parse("2.0").unwrap()));
    }

    #[test]
    fn test_existing_excludes_deleted_versions() {
        let rolled = rollup(vec![
            entry("pkg", "1.0.0", 1, PACKAGE_DETAILS_TYPE),
            entry("pkg", "1.0.0", 5, PACKAGE_DELETE_TYPE),
            entry("pkg", "2.0.0", 2, PACKAGE_DETAILS_TYPE),
            entry("gone", "1.0.0", 6, PACKAGE_DELETE_TYPE),
        ]);

        let set = PackageSet::existing_from_rolled_up(&rolled);
        assert_eq!(set.len(), 1);
        assert!(!set.contains("pkg", &PackageVersion::parse("1.0.0").unwrap()));
        assert!(set.contains("Pkg", &PackageVersion::parse("2.0").unwrap()));
        assert!(set.get("gone").is_none());
    }

    #[test]
    fn test_republished_after_delete_exists() {
        let rolled = rollup(vec![
            entry("pkg", "1.0.0", 1, PACKAGE_DETAILS_TYPE),
            entry("pkg", "1.0.0", 2, PACKAGE_DELETE_TYPE),
            entry("pkg", "1.0.0", 3, PACKAGE_DETAILS_TYPE),
        ]);

        let set = PackageSet::existing_from_rolled_up(&rolled);
        assert!(set.contains("pkg", &PackageVersion::new(1, 0, 0)));
    }

    #[test]
    fn test_id_from_latest_entry() {
        let rolled = rollup(vec![
            entry("newcase", "1.0.0", 1, PACKAGE_DETAILS_TYPE),
            entry("NewCase", "1.0.1", 2, PACKAGE_DETAILS_TYPE),
        ]);

        let set = PackageSet::from_rolled_up(&rolled);
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next().unwrap().id, "NewCase");
    }
}
