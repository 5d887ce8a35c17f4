//! Crossref works reader: structural validation, ignorable-field stripping
//! and watermark tracking over any dump container.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;

use super::{json_records, JsonRecords};

/// Reads Crossref work records out of a dump file.
///
/// Records that are not JSON objects, carry no usable DOI, or describe a
/// `component` DOI (a sub-part of a publication, not a citable work) are
/// counted as rejected and skipped.
#[derive(Debug, Clone)]
pub struct CrossrefReader {
    ignore_fields: Vec<String>,
}

impl CrossrefReader {
    pub fn new(ignore_fields: &[String]) -> Self {
        Self {
            ignore_fields: ignore_fields.to_vec(),
        }
    }

    /// Open a dump file as a validated record stream.
    pub fn records(&self, path: &Path) -> Result<CrossrefRecords> {
        Ok(CrossrefRecords {
            records: json_records(path)?,
            ignore_fields: self.ignore_fields.clone(),
            read: 0,
            rejected: 0,
            latest_indexed: None,
        })
    }

    /// Wrap an already-decoded page of records, as handed over by the
    /// incremental feed.
    pub fn page<'a>(&self, items: &'a [Value]) -> PageRecords<'a> {
        PageRecords {
            items: items.iter(),
            ignore_fields: self.ignore_fields.clone(),
            rejected: 0,
            latest_indexed: None,
        }
    }
}

/// Validated record stream over a dump file.
pub struct CrossrefRecords {
    records: JsonRecords,
    ignore_fields: Vec<String>,
    read: u64,
    rejected: u64,
    latest_indexed: Option<DateTime<Utc>>,
}

impl CrossrefRecords {
    /// Records pulled from the container, valid or not.
    pub fn read(&self) -> u64 {
        self.read
    }

    /// Structurally rejected records plus unparseable lines.
    pub fn rejected(&self) -> u64 {
        self.rejected + self.records.malformed()
    }

    /// Highest `indexed.date-time` seen so far; the next watermark once the
    /// stream is exhausted.
    pub fn latest_indexed(&self) -> Option<DateTime<Utc>> {
        self.latest_indexed
    }
}

impl Iterator for CrossrefRecords {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        loop {
            let mut record = self.records.next()?;
            self.read += 1;
            if is_incomplete(&record) {
                self.rejected += 1;
                continue;
            }
            track_latest_indexed(&record, &mut self.latest_indexed);
            strip_fields(&mut record, &self.ignore_fields);
            return Some(record);
        }
    }
}

/// Validated view over a page of feed records already held in memory.
pub struct PageRecords<'a> {
    items: std::slice::Iter<'a, Value>,
    ignore_fields: Vec<String>,
    rejected: u64,
    latest_indexed: Option<DateTime<Utc>>,
}

impl PageRecords<'_> {
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    pub fn latest_indexed(&self) -> Option<DateTime<Utc>> {
        self.latest_indexed
    }
}

impl Iterator for PageRecords<'_> {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        loop {
            let record = self.items.next()?;
            if is_incomplete(record) {
                self.rejected += 1;
                continue;
            }
            track_latest_indexed(record, &mut self.latest_indexed);
            let mut record = record.clone();
            strip_fields(&mut record, &self.ignore_fields);
            return Some(record);
        }
    }
}

fn is_incomplete(record: &Value) -> bool {
    let Some(object) = record.as_object() else {
        return true;
    };
    let has_doi = object
        .get("DOI")
        .and_then(Value::as_str)
        .is_some_and(|doi| !doi.trim().is_empty());
    if !has_doi {
        return true;
    }
    object.get("type").and_then(Value::as_str) == Some("component")
}

fn track_latest_indexed(record: &Value, latest: &mut Option<DateTime<Utc>>) {
    let Some(date_time) = record
        .get("indexed")
        .and_then(|indexed| indexed.get("date-time"))
        .and_then(Value::as_str)
    else {
        return;
    };
    match DateTime::parse_from_rfc3339(date_time) {
        Ok(parsed) => {
            let parsed = parsed.with_timezone(&Utc);
            if latest.map_or(true, |current| parsed > current) {
                *latest = Some(parsed);
            }
        }
        Err(_) => warn!(date_time, "indexed date could not be parsed"),
    }
}

fn strip_fields(record: &mut Value, ignore_fields: &[String]) {
    let Some(object) = record.as_object_mut() else {
        return;
    };
    for field in ignore_fields {
        object.remove(field);
    }
    object.remove("_id");
}
