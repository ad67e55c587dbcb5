use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::PinRecord;
use crate::pins::traits::PinSource;

/// Fetches the pin resource over HTTP with a cache-busting query parameter
pub struct HttpPinSource {
    client: Client,
    url: String,
}

impl HttpPinSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::ResourceUnavailable(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    fn cache_busted_url(&self) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}v={}", self.url, separator, Utc::now().timestamp_millis())
    }
}

#[async_trait]
impl PinSource for HttpPinSource {
    async fn fetch(&self) -> Result<String> {
        let url = self.cache_busted_url();
        debug!("Fetching pin resource: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::ResourceUnavailable(format!("{url}: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::ResourceUnavailable(format!(
                "{} returned status {}",
                self.url,
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| Error::ResourceUnavailable(format!("failed to read response body: {e}")))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Reads the pin resource from a local file
pub struct FilePinSource {
    path: PathBuf,
}

impl FilePinSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PinSource for FilePinSource {
    async fn fetch(&self) -> Result<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::ResourceUnavailable(format!("{}: {e}", self.path.display())))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Serves a fixed payload, or fails as unavailable when there is none
pub struct StaticPinSource {
    payload: Option<String>,
}

impl StaticPinSource {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: Some(payload.into()),
        }
    }

    pub fn unavailable() -> Self {
        Self { payload: None }
    }
}

#[async_trait]
impl PinSource for StaticPinSource {
    async fn fetch(&self) -> Result<String> {
        self.payload
            .clone()
            .ok_or_else(|| Error::ResourceUnavailable("static pin resource is empty".to_string()))
    }

    fn describe(&self) -> String {
        "static payload".to_string()
    }
}

/// Pick a source for a location: HTTP(S) URLs are fetched, anything else is a file path.
pub fn source_for(location: &str) -> Result<Box<dyn PinSource>> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Ok(Box::new(HttpPinSource::new(location)?))
    } else {
        Ok(Box::new(FilePinSource::new(location)))
    }
}

/// Parse a pin resource payload.
///
/// The payload must be JSON. A missing or non-array `pinnedCards` yields an
/// empty set, malformed records are skipped and duplicate identities keep
/// their first record.
pub fn parse_pin_records(payload: &str) -> Result<Vec<PinRecord>> {
    let document: Value = serde_json::from_str(payload)?;

    let Some(entries) = document.get("pinnedCards").and_then(Value::as_array) else {
        warn!("Pin resource has no pinnedCards array, treating as empty");
        return Ok(Vec::new());
    };

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(entries.len());

    for (idx, entry) in entries.iter().enumerate() {
        match serde_json::from_value::<PinRecord>(entry.clone()) {
            Ok(record) => {
                if seen.insert(record.id.clone()) {
                    records.push(record);
                } else {
                    warn!("Skipping duplicate pin record for {}", record.id);
                }
            }
            Err(e) => warn!("Skipping malformed pin record #{}: {}", idx, e),
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_well_formed_document() {
        let records = parse_pin_records(
            r#"{"pinnedCards":[
                {"id":"A-X-single","title":"A","area":"X","roomType":"single","priority":2,"pinnedAt":"2024-01-01T00:00:00Z"},
                {"id":"B-X-double","title":"B","area":"X","roomType":"double","priority":1,"pinnedAt":"2024-01-01T00:00:00Z","criteria":{"roomType":"double"}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].criteria.as_ref().unwrap().room_type.as_deref(), Some("double"));
    }

    #[test]
    fn missing_or_wrong_shape_is_empty() {
        assert!(parse_pin_records("{}").unwrap().is_empty());
        assert!(parse_pin_records(r#"{"pinnedCards": "nope"}"#).unwrap().is_empty());
        assert!(parse_pin_records("[]").unwrap().is_empty());
    }

    #[test]
    fn invalid_json_is_malformed() {
        assert!(matches!(parse_pin_records("{not json"), Err(Error::MalformedData(_))));
    }

    #[test]
    fn skips_bad_records_and_duplicates() {
        let records = parse_pin_records(
            r#"{"pinnedCards":[
                {"id":"A-X-single","priority":1},
                {"title":"no id","priority":2},
                {"id":"A-X-single","priority":5},
                {"id":"C-X-triple","priority":"high"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].priority, 1);
    }

    #[test]
    fn cache_busting_respects_existing_query() {
        let plain = HttpPinSource::new("http://localhost/js/pinned-cards.json").unwrap();
        assert!(plain.cache_busted_url().contains("pinned-cards.json?v="));
        let query = HttpPinSource::new("http://localhost/pins?site=jammu").unwrap();
        assert!(query.cache_busted_url().contains("site=jammu&v="));
    }

    #[test]
    fn source_for_picks_by_scheme() {
        assert_eq!(
            source_for("https://example.com/pins.json").unwrap().describe(),
            "https://example.com/pins.json"
        );
        assert_eq!(source_for("js/pinned-cards.json").unwrap().describe(), "js/pinned-cards.json");
    }

    #[tokio::test]
    async fn file_source_reads_and_reports_missing_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"pinnedCards":[]}}"#).unwrap();
        let source = FilePinSource::new(file.path());
        assert_eq!(source.fetch().await.unwrap(), r#"{"pinnedCards":[]}"#);

        let missing = FilePinSource::new("/definitely/not/here.json");
        assert!(matches!(missing.fetch().await, Err(Error::ResourceUnavailable(_))));
    }
}
