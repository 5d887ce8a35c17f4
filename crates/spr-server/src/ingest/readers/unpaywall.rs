//! Unpaywall reader: gzip JSONL, emits `(doi, pdf url)` pairs for the
//! open-access link table.

use std::io::BufRead;
use std::path::Path;

use anyhow::Result;
use serde::Deserialize;
use tracing::{debug, error};

use super::open_dump;

#[derive(Debug, Deserialize)]
struct UnpaywallRecord {
    doi: Option<String>,
    best_oa_location: Option<OaLocation>,
}

#[derive(Debug, Deserialize)]
struct OaLocation {
    url_for_pdf: Option<String>,
}

/// Reads Unpaywall records, keeping only those with a best open-access
/// location that points at a PDF. Everything else is counted and skipped.
#[derive(Debug, Clone, Default)]
pub struct UnpaywallReader;

impl UnpaywallReader {
    pub fn new() -> Self {
        Self
    }

    pub fn records(&self, path: &Path) -> Result<UnpaywallRecords> {
        Ok(UnpaywallRecords {
            reader: open_dump(path)?,
            read: 0,
            skipped: 0,
        })
    }
}

pub struct UnpaywallRecords {
    reader: Box<dyn BufRead + Send>,
    read: u64,
    skipped: u64,
}

impl UnpaywallRecords {
    pub fn read(&self) -> u64 {
        self.read
    }

    /// Unparseable lines plus records without a DOI or an OA pdf link.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl Iterator for UnpaywallRecords {
    type Item = (String, String);

    fn next(&mut self) -> Option<(String, String)> {
        loop {
            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "read error in unpaywall dump, stopping");
                    return None;
                }
            }
            if line.trim().is_empty() {
                continue;
            }
            self.read += 1;
            let record = match serde_json::from_str::<UnpaywallRecord>(&line) {
                Ok(record) => record,
                Err(e) => {
                    self.skipped += 1;
                    debug!(error = %e, "skipping malformed unpaywall line");
                    continue;
                }
            };
            let doi = record.doi.filter(|doi| !doi.trim().is_empty());
            let url = record
                .best_oa_location
                .and_then(|location| location.url_for_pdf)
                .filter(|url| !url.trim().is_empty());
            match (doi, url) {
                (Some(doi), Some(url)) => return Some((doi, url)),
                _ => self.skipped += 1,
            }
        }
    }
}
