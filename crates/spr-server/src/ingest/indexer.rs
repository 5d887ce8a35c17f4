//! Bulk indexer for the blocking index.
//!
//! Converts bibliographical records into the flat documents the matching
//! queries run against and ships them with `_bulk` NDJSON requests. Bulk
//! item failures are logged and counted, never raised: a half-indexed batch
//! still serves lookups, the next run repairs the rest.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, error};

use crate::config::SearchConfig;

const BULK_TIMEOUT: Duration = Duration::from_secs(120);

/// Outcome of one indexing call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexSummary {
    pub indexed: u64,
    pub failed: u64,
    /// Records that could not be turned into an index document.
    pub skipped: u64,
}

impl IndexSummary {
    pub fn absorb(&mut self, other: IndexSummary) {
        self.indexed += other.indexed;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

/// Client for the `_bulk` endpoint of the configured search backend.
#[derive(Debug, Clone)]
pub struct SearchIndexer {
    http: reqwest::Client,
    bulk_url: String,
    index: String,
    batch_size: usize,
}

impl SearchIndexer {
    pub fn new(search: &SearchConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(BULK_TIMEOUT).build()?;
        let host = search.host.trim_end_matches('/');
        Ok(Self {
            http,
            bulk_url: format!("{host}/_bulk"),
            index: search.index.clone(),
            batch_size: search.indexing_batch_size.max(1),
        })
    }

    /// Index a slice of records in `_bulk` batches of the configured size.
    pub async fn index_records(&self, records: &[Value]) -> Result<IndexSummary> {
        let mut summary = IndexSummary::default();
        let mut body = String::new();
        let mut actions = 0usize;

        for record in records {
            let Some((id, document)) = index_document(record) else {
                summary.skipped += 1;
                continue;
            };
            let action = json!({ "index": { "_index": self.index, "_id": id } });
            body.push_str(&action.to_string());
            body.push('\n');
            body.push_str(&document.to_string());
            body.push('\n');
            actions += 1;

            if actions >= self.batch_size {
                self.send_bulk(std::mem::take(&mut body), actions, &mut summary)
                    .await?;
                actions = 0;
            }
        }
        if actions > 0 {
            self.send_bulk(body, actions, &mut summary).await?;
        }
        Ok(summary)
    }

    async fn send_bulk(
        &self,
        body: String,
        actions: usize,
        summary: &mut IndexSummary,
    ) -> Result<()> {
        let response = self
            .http
            .post(&self.bulk_url)
            .header("content-type", "application/x-ndjson")
            .body(body)
            .send()
            .await
            .context("bulk indexing request failed")?
            .error_for_status()
            .context("bulk indexing request rejected")?;

        let bulk: BulkResponse = response
            .json()
            .await
            .context("unreadable bulk indexing response")?;

        let mut failed = 0u64;
        if bulk.errors {
            for item in &bulk.items {
                if let Some(error) = item.index.as_ref().and_then(|op| op.error.as_ref()) {
                    failed += 1;
                    error!(reason = %error.reason.as_deref().unwrap_or("unknown"), "bulk item rejected");
                }
            }
        }
        summary.indexed += actions as u64 - failed;
        summary.failed += failed;
        debug!(actions, failed, "bulk batch sent");
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<BulkItem>,
}

#[derive(Debug, Default, Deserialize)]
struct BulkItem {
    #[serde(default)]
    index: Option<BulkOp>,
}

#[derive(Debug, Default, Deserialize)]
struct BulkOp {
    #[serde(default)]
    error: Option<BulkError>,
}

#[derive(Debug, Default, Deserialize)]
struct BulkError {
    #[serde(default)]
    reason: Option<String>,
}

/// Build the blocking document for one record.
///
/// The document id is the lower-cased DOI, falling back to the HAL id for
/// records that only exist in HAL. Records with neither identifier, and
/// `component` DOIs, yield nothing.
pub fn index_document(record: &Value) -> Option<(String, Value)> {
    let object = record.as_object()?;
    if object.get("type").and_then(Value::as_str) == Some("component") {
        return None;
    }
    let doi = object
        .get("DOI")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|doi| !doi.is_empty());
    let hal_id = object
        .get("halId")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|hal_id| !hal_id.is_empty());
    let id = doi.or(hal_id)?.to_lowercase();

    let mut doc = Map::new();
    if let Some(doi) = doi {
        doc.insert("DOI".to_string(), json!(doi));
    }
    if let Some(hal_id) = hal_id {
        doc.insert("halId".to_string(), json!(hal_id));
    }
    if let Some(titles) = string_array(object.get("title")) {
        doc.insert("title".to_string(), json!(titles));
    }
    let (author, first_author) = author_fields(object);
    if let Some(author) = &author {
        doc.insert("author".to_string(), json!(author));
    }
    if let Some(first_author) = &first_author {
        doc.insert("first_author".to_string(), json!(first_author));
    }
    if let Some(first_page) = first_page_of(object) {
        doc.insert("first_page".to_string(), json!(first_page));
    }
    if let Some(journal) = string_array(object.get("container-title")) {
        doc.insert("journal".to_string(), json!(journal));
    }
    if let Some(abbreviated) = string_array(object.get("short-container-title")) {
        doc.insert("abbreviated_journal".to_string(), json!(abbreviated));
    }
    if let Some(volume) = non_blank_str(object.get("volume")) {
        doc.insert("volume".to_string(), json!(volume));
    }
    if let Some(issue) = non_blank_str(object.get("issue")) {
        doc.insert("issue".to_string(), json!(issue));
    }
    if let Some(year) = year_of(object) {
        doc.insert("year".to_string(), json!(year));
    }
    let bibliographic = bibliographic_field(&doc);
    if !bibliographic.is_empty() {
        doc.insert("bibliographic".to_string(), json!(bibliographic));
    }

    Some((id, Value::Object(doc)))
}

/// Titles and journal names arrive as arrays; embedded newlines are
/// flattened so the analyzed field stays one line.
fn string_array(value: Option<&Value>) -> Option<Vec<String>> {
    let cleaned: Vec<String> = match value? {
        Value::String(s) => vec![collapse_whitespace(s)],
        Value::Array(values) => values
            .iter()
            .filter_map(Value::as_str)
            .map(collapse_whitespace)
            .filter(|s| !s.is_empty())
            .collect(),
        _ => return None,
    };
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_blank_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// All family names space-joined, and the `sequence == "first"` family name
/// with the head of the author list as fallback.
fn author_fields(record: &Map<String, Value>) -> (Option<String>, Option<String>) {
    let Some(authors) = record.get("author").and_then(Value::as_array) else {
        return (None, None);
    };
    let mut families = Vec::new();
    let mut first = None;
    for author in authors {
        let family = author.get("family").and_then(Value::as_str);
        if first.is_none()
            && author.get("sequence").and_then(Value::as_str) == Some("first")
        {
            if let Some(family) = family {
                first = Some(family.to_string());
            }
        }
        if let Some(family) = family {
            families.push(family);
        }
    }
    let first = first.or_else(|| {
        authors
            .first()
            .and_then(|author| author.get("family"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    let author = if families.is_empty() {
        None
    } else {
        Some(families.join(" "))
    };
    (author, first)
}

fn first_page_of(record: &Map<String, Value>) -> Option<String> {
    record
        .get("page")
        .and_then(Value::as_str)
        .and_then(|page| page.split([',', '-', ' ']).next())
        .map(str::trim)
        .filter(|page| !page.is_empty())
        .map(str::to_string)
}

/// First date part of `issued`, `published-online`, `published-print` or
/// `created`, in that order. `created` is only a deposit date, but it
/// guarantees a conservative fallback year.
fn year_of(record: &Map<String, Value>) -> Option<String> {
    for field in ["issued", "published-online", "published-print", "created"] {
        let year = record
            .get(field)
            .and_then(|date| date.get("date-parts"))
            .and_then(Value::as_array)
            .and_then(|parts| parts.first())
            .and_then(Value::as_array)
            .and_then(|first| first.first());
        match year {
            Some(Value::Number(n)) => return Some(n.to_string()),
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            _ => {}
        }
    }
    None
}

/// Concatenation of the usual citation metadata, the haystack for
/// raw-string matching.
fn bibliographic_field(doc: &Map<String, Value>) -> String {
    let mut parts: Vec<String> = Vec::new();
    if doc.contains_key("author") {
        push_value(&mut parts, doc.get("author"));
    } else {
        push_value(&mut parts, doc.get("first_author"));
    }
    push_value(&mut parts, doc.get("title"));
    push_value(&mut parts, doc.get("journal"));
    push_value(&mut parts, doc.get("abbreviated_journal"));
    push_value(&mut parts, doc.get("volume"));
    push_value(&mut parts, doc.get("issue"));
    push_value(&mut parts, doc.get("first_page"));
    push_value(&mut parts, doc.get("year"));
    parts.join(" ")
}

fn push_value(parts: &mut Vec<String>, value: Option<&Value>) {
    match value {
        Some(Value::String(s)) if !s.is_empty() => parts.push(s.clone()),
        Some(Value::Array(values)) => {
            let joined = values
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" ");
            if !joined.is_empty() {
                parts.push(joined);
            }
        }
        _ => {}
    }
}
