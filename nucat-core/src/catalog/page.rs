//! Catalog page fetching and parsing
//!
//! A page is a JSON document whose `items` array holds catalog entries.
//! Parsing is strict: a missing field or unparsable value fails the whole
//! page, since a damaged catalog page means the feed itself is broken.

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;
use url::Url;

use super::entry::{parse_commit_timestamp, CatalogEntry};
use super::version::PackageVersion;
use crate::config::{DEFAULT_ID_FIELD, DEFAULT_VERSION_FIELD};
use crate::error::{CatalogError, Result};
use crate::transport::Transport;

/// Kind of catalog document, used to pick the error for a bad body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DocumentKind {
    Index,
    Page,
}

impl DocumentKind {
    pub(crate) fn malformed(self, uri: &Url, reason: impl Into<String>) -> CatalogError {
        let uri = uri.clone();
        let reason = reason.into();
        match self {
            DocumentKind::Index => CatalogError::MalformedIndex { uri, reason },
            DocumentKind::Page => CatalogError::MalformedPage { uri, reason },
        }
    }
}

/// Names of the page item properties carrying package identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFields {
    pub id: String,
    pub version: String,
}

impl Default for EntryFields {
    fn default() -> Self {
        Self {
            id: DEFAULT_ID_FIELD.to_string(),
            version: DEFAULT_VERSION_FIELD.to_string(),
        }
    }
}

/// Fetches catalog documents through a shared transport
///
/// Each call issues exactly one request. There is no caching or retry here.
#[derive(Clone)]
pub struct PageFetcher {
    transport: Arc<dyn Transport>,
    fields: EntryFields,
}

impl PageFetcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            fields: EntryFields::default(),
        }
    }

    /// Use different page item properties for id and version
    pub fn with_fields(mut self, fields: EntryFields) -> Self {
        self.fields = fields;
        self
    }

    pub fn fields(&self) -> &EntryFields {
        &self.fields
    }

    /// Fetch a page and return its parsed JSON document
    pub async fn fetch(&self, uri: &Url) -> Result<Value> {
        self.fetch_document(uri, DocumentKind::Page).await
    }

    /// Fetch a page and parse its entries
    pub async fn fetch_entries(&self, uri: &Url) -> Result<Vec<CatalogEntry>> {
        let document = self.fetch(uri).await?;
        let entries = parse_page(uri, &document, &self.fields)?;
        debug!("Parsed {} entries from {}", entries.len(), uri);
        Ok(entries)
    }

    pub(crate) async fn fetch_document(&self, uri: &Url, kind: DocumentKind) -> Result<Value> {
        let body = self
            .transport
            .get(uri)
            .await
            .map_err(|source| CatalogError::Transport {
                uri: uri.clone(),
                source,
            })?;

        // serde_json never interprets date-like strings, so timestamps stay
        // verbatim until parsed strictly below.
        serde_json::from_slice(&body)
            .map_err(|e| kind.malformed(uri, format!("invalid JSON: {e}")))
    }
}

/// Parse every entry of a page document
pub fn parse_page(uri: &Url, document: &Value, fields: &EntryFields) -> Result<Vec<CatalogEntry>> {
    let items = items_array(uri, document, DocumentKind::Page)?;

    items
        .iter()
        .enumerate()
        .map(|(position, item)| {
            let item = item.as_object().ok_or_else(|| {
                DocumentKind::Page.malformed(uri, format!("item {position} is not an object"))
            })?;
            parse_item(uri, position, item, fields)
        })
        .collect()
}

fn parse_item(
    page: &Url,
    position: usize,
    item: &Map<String, Value>,
    fields: &EntryFields,
) -> Result<CatalogEntry> {
    let kind = DocumentKind::Page;

    let raw_uri = required_str(page, kind, position, item, "@id")?;
    let uri = page.join(raw_uri).map_err(|_| CatalogError::InvalidId {
        uri: page.clone(),
        field: "@id",
        value: raw_uri.to_string(),
    })?;

    let types = parse_types(page, position, item)?;
    let commit_id = required_str(page, kind, position, item, "commitId")?;

    let raw_timestamp = required_str(page, kind, position, item, "commitTimeStamp")?;
    let commit_timestamp =
        parse_commit_timestamp(raw_timestamp).ok_or_else(|| CatalogError::InvalidTimestamp {
            uri: page.clone(),
            value: raw_timestamp.to_string(),
        })?;

    let id = required_str(page, kind, position, item, &fields.id)?;
    if id.trim().is_empty() {
        return Err(CatalogError::InvalidId {
            uri: page.clone(),
            field: "package id",
            value: id.to_string(),
        });
    }

    let raw_version = required_str(page, kind, position, item, &fields.version)?;
    let version =
        PackageVersion::parse(raw_version).map_err(|e| CatalogError::InvalidVersion {
            uri: page.clone(),
            value: raw_version.to_string(),
            reason: e.to_string(),
        })?;

    Ok(CatalogEntry::new(
        uri,
        types,
        commit_id,
        commit_timestamp,
        id.trim(),
        version,
    ))
}

/// `@type` is a single string or, in expanded JSON-LD, an array of strings
fn parse_types(page: &Url, position: usize, item: &Map<String, Value>) -> Result<Vec<String>> {
    let kind = DocumentKind::Page;
    match item.get("@type") {
        Some(Value::String(t)) => Ok(vec![t.clone()]),
        Some(Value::Array(values)) if !values.is_empty() => values
            .iter()
            .map(|v| {
                v.as_str().map(str::to_string).ok_or_else(|| {
                    kind.malformed(page, format!("item {position} has a non-string '@type'"))
                })
            })
            .collect(),
        Some(_) => Err(kind.malformed(page, format!("item {position} has an invalid '@type'"))),
        None => Err(kind.malformed(page, format!("item {position} is missing '@type'"))),
    }
}

pub(crate) fn items_array<'a>(
    uri: &Url,
    document: &'a Value,
    kind: DocumentKind,
) -> Result<&'a Vec<Value>> {
    match document.get("items") {
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(kind.malformed(uri, "'items' is not an array")),
        None => Err(kind.malformed(uri, "missing 'items'")),
    }
}

pub(crate) fn required_str<'a>(
    uri: &Url,
    kind: DocumentKind,
    position: usize,
    item: &'a Map<String, Value>,
    field: &str,
) -> Result<&'a str> {
    match item.get(field) {
        Some(Value::String(value)) => Ok(value),
        Some(_) => Err(kind.malformed(
            uri,
            format!("item {position} field '{field}' is not a string"),
        )),
        None => Err(kind.malformed(uri, format!("item {position} is missing '{field}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use serde_json::json;

    const PAGE: &str = "https://example.org/catalog/page0.json";

    fn page_uri() -> Url {
        Url::parse(PAGE).unwrap()
    }

    fn item(id: &str, version: &str, ts: &str) -> Value {
        json!({
            "@id": format!("https://example.org/catalog/data/{id}.{version}.json"),
            "@type": "nuget:PackageDetails",
            "commitId": "8ce4a4e1-2c06-4b5b-b4e2-9e0a3e5c3c01",
            "commitTimeStamp": ts,
            "nuget:id": id,
            "nuget:version": version,
        })
    }

    #[test]
    fn test_parse_page() {
        let document = json!({
            "items": [
                item("Newtonsoft.Json", "9.0.1", "2016-07-30T00:05:22.6952071Z"),
                item("xunit", "2.2.0-beta2-build3300", "2016-07-30T00:06:21.8534934Z"),
            ]
        });

        let entries = parse_page(&page_uri(), &document, &EntryFields::default()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id(), "Newtonsoft.Json");
        assert_eq!(entries[0].version().to_normalized_string(), "9.0.1");
        assert_eq!(entries[0].types(), ["nuget:PackageDetails".to_string()]);
        assert!(entries[1].version().is_prerelease());
        assert!(entries[0].commit_timestamp() < entries[1].commit_timestamp());
    }

    #[test]
    fn test_empty_items_is_valid() {
        let entries =
            parse_page(&page_uri(), &json!({ "items": [] }), &EntryFields::default()).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_type_array() {
        let mut value = item("pkg", "1.0.0", "2016-07-30T00:05:22Z");
        value["@type"] = json!(["nuget:PackageDelete", "catalog:Permalink"]);
        let entries = parse_page(&page_uri(), &json!({ "items": [value] }), &EntryFields::default())
            .unwrap();
        assert!(entries[0].is_delete());
        assert_eq!(entries[0].types().len(), 2);
    }

    #[test]
    fn test_missing_items() {
        let err = parse_page(&page_uri(), &json!({}), &EntryFields::default()).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedPage { .. }));
        assert!(err.to_string().contains("missing 'items'"));
    }

    #[test]
    fn test_missing_field_fails_page() {
        let mut value = item("pkg", "1.0.0", "2016-07-30T00:05:22Z");
        value.as_object_mut().unwrap().remove("commitId");
        let document = json!({ "items": [item("ok", "1.0.0", "2016-07-30T00:05:22Z"), value] });

        let err = parse_page(&page_uri(), &document, &EntryFields::default()).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedPage { .. }));
        assert!(err.to_string().contains("item 1 is missing 'commitId'"));
    }

    #[test]
    fn test_bad_values_fail_page() {
        let bad_ts = json!({ "items": [item("pkg", "1.0.0", "2016-07-30 00:05:22")] });
        assert!(matches!(
            parse_page(&page_uri(), &bad_ts, &EntryFields::default()),
            Err(CatalogError::InvalidTimestamp { .. })
        ));

        let bad_version = json!({ "items": [item("pkg", "one.two", "2016-07-30T00:05:22Z")] });
        assert!(matches!(
            parse_page(&page_uri(), &bad_version, &EntryFields::default()),
            Err(CatalogError::InvalidVersion { .. })
        ));

        let bad_id = json!({ "items": [item("  ", "1.0.0", "2016-07-30T00:05:22Z")] });
        assert!(matches!(
            parse_page(&page_uri(), &bad_id, &EntryFields::default()),
            Err(CatalogError::InvalidId { .. })
        ));
    }

    #[test]
    fn test_custom_fields() {
        let document = json!({
            "items": [{
                "@id": "data/pkg.json",
                "@type": "nuget:PackageDetails",
                "commitId": "c1",
                "commitTimeStamp": "2016-07-30T00:05:22Z",
                "id": "pkg",
                "version": "1.0",
            }]
        });
        let fields = EntryFields {
            id: "id".to_string(),
            version: "version".to_string(),
        };

        let entries = parse_page(&page_uri(), &document, &fields).unwrap();
        assert_eq!(entries[0].id(), "pkg");
        assert_eq!(
            entries[0].uri().as_str(),
            "https://example.org/catalog/data/pkg.json"
        );
    }

    #[tokio::test]
    async fn test_fetch_entries() {
        let transport = MockTransport::new().with_document(
            PAGE,
            json!({ "items": [item("pkg", "1.0.0", "2016-07-30T00:05:22Z")] }),
        );
        let fetcher = PageFetcher::new(Arc::new(transport));

        let entries = fetcher.fetch_entries(&page_uri()).await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_invalid_json() {
        let transport = MockTransport::new().with_raw(PAGE, "{ \"items\": [");
        let fetcher = PageFetcher::new(Arc::new(transport));

        let err = fetcher.fetch_entries(&page_uri()).await.unwrap_err();
        assert!(matches!(err, CatalogError::MalformedPage { .. }));
    }

    #[tokio::test]
    async fn test_fetch_transport_failure() {
        let transport = MockTransport::new().with_failure(PAGE, 500);
        let fetcher = PageFetcher::new(Arc::new(transport));

        let err = fetcher.fetch(&page_uri()).await.unwrap_err();
        assert!(err.is_transport());
    }
}
