//! Reader configuration
//!
//! Settings are resolved in this order, later sources winning:
//!
//! 1. Built-in defaults (the public nuget.org catalog)
//! 2. `<config dir>/nucat/config.yaml`
//! 3. `NUCAT_INDEX_URL` / `NUCAT_MAX_CONCURRENCY` environment variables
//! 4. CLI flags (applied by the caller)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Default catalog index
pub const DEFAULT_INDEX_URL: &str = "https://api.nuget.org/v3/catalog0/index.json";

/// Page fetches in flight for windowed reads
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// Page fetches in flight for full-history scans
pub const FULL_SCAN_MAX_CONCURRENCY: usize = 32;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Page item property holding the package id
pub const DEFAULT_ID_FIELD: &str = "nuget:id";

/// Page item property holding the package version
pub const DEFAULT_VERSION_FIELD: &str = "nuget:version";

pub const INDEX_URL_ENV: &str = "NUCAT_INDEX_URL";
pub const MAX_CONCURRENCY_ENV: &str = "NUCAT_MAX_CONCURRENCY";

/// Catalog reader configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// URL of the catalog index document
    pub index_url: String,

    /// Maximum page fetches in flight for windowed reads
    pub max_concurrency: usize,

    /// Maximum page fetches in flight for full-history reads
    pub full_scan_concurrency: usize,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,

    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Page item property holding the package id
    pub id_field: String,

    /// Page item property holding the package version
    pub version_field: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            index_url: DEFAULT_INDEX_URL.to_string(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            full_scan_concurrency: FULL_SCAN_MAX_CONCURRENCY,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            user_agent: concat!("nucat/", env!("CARGO_PKG_VERSION")).to_string(),
            id_field: DEFAULT_ID_FIELD.to_string(),
            version_field: DEFAULT_VERSION_FIELD.to_string(),
        }
    }
}

impl CatalogConfig {
    /// Load configuration from the default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::default_config_path() {
            Some(path) => Self::load_from_path(&path)?,
            None => {
                tracing::debug!("No config directory available, using defaults");
                Self::default()
            }
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// A missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        let config: Self = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "nucat")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Cap every read, windowed or full-history, at `max_concurrency`
    pub fn set_concurrency(&mut self, max_concurrency: usize) {
        self.max_concurrency = max_concurrency;
        self.full_scan_concurrency = max_concurrency;
    }

    /// Apply `NUCAT_*` environment overrides
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var(INDEX_URL_ENV) {
            self.index_url = url;
        }

        if let Ok(value) = std::env::var(MAX_CONCURRENCY_ENV) {
            let max_concurrency = value
                .trim()
                .parse()
                .with_context(|| format!("{MAX_CONCURRENCY_ENV} must be a number, got '{value}'"))?;
            self.set_concurrency(max_concurrency);
        }

        Ok(())
    }

    /// Check settings that would make every read fail
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 || self.full_scan_concurrency == 0 {
            anyhow::bail!("max_concurrency and full_scan_concurrency must be at least 1");
        }

        if self.timeout_seconds == 0 {
            anyhow::bail!("timeout_seconds must be at least 1");
        }

        let url = self.index_url()?;
        if url.scheme() != "http" && url.scheme() != "https" {
            anyhow::bail!("Catalog index URL must start with http:// or https://");
        }

        Ok(())
    }

    /// Parsed index URL
    pub fn index_url(&self) -> Result<Url> {
        Url::parse(&self.index_url)
            .with_context(|| format!("Invalid catalog index URL: {}", self.index_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = CatalogConfig::default();
        assert_eq!(config.index_url, DEFAULT_INDEX_URL);
        assert_eq!(config.max_concurrency, DEFAULT_MAX_CONCURRENCY);
        assert!(config.user_agent.starts_with("nucat/"));
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = CatalogConfig::load_from_path(&temp_dir.path().join("config.yaml")).unwrap();
        assert_eq!(config, CatalogConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "index_url: https://catalog.example.org/index.json\nmax_concurrency: 4\n",
        )
        .unwrap();

        let config = CatalogConfig::load_from_path(&path).unwrap();
        assert_eq!(config.index_url, "https://catalog.example.org/index.json");
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.full_scan_concurrency, FULL_SCAN_MAX_CONCURRENCY);
        assert_eq!(config.timeout_seconds, DEFAULT_TIMEOUT_SECONDS);
        assert_eq!(config.id_field, DEFAULT_ID_FIELD);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(&path, "max_concurrency: [not, a, number]\n").unwrap();

        let err = CatalogConfig::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = CatalogConfig {
            max_concurrency: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = CatalogConfig {
            index_url: "ftp://example.org/index.json".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = CatalogConfig {
            index_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var(INDEX_URL_ENV, "https://mirror.example.org/index.json");
        std::env::set_var(MAX_CONCURRENCY_ENV, "8");

        let mut config = CatalogConfig::default();
        let result = config.apply_env();

        std::env::remove_var(INDEX_URL_ENV);
        std::env::remove_var(MAX_CONCURRENCY_ENV);

        result.unwrap();
        assert_eq!(config.index_url, "https://mirror.example.org/index.json");
        assert_eq!(config.max_concurrency, 8);
        assert_eq!(config.full_scan_concurrency, 8);
    }

    #[test]
    #[serial]
    fn test_env_override_rejects_garbage() {
        std::env::set_var(MAX_CONCURRENCY_ENV, "many");
        let mut config = CatalogConfig::default();
        let result = config.apply_env();
        std::env::remove_var(MAX_CONCURRENCY_ENV);

        assert!(result.is_err());
    }
}
