//! Crossref metadata table: lower-cased DOI → compressed JSON document.
//!
//! The ingestion watermark (the highest `indexed` date-time seen by a load)
//! lives in the same database under a reserved key, so it travels with the
//! data it describes.

use heed3::types::{Bytes, Str};
use heed3::{Database, Env};
use tracing::warn;

use crate::codec;
use crate::config::StoreConfig;
use crate::env::open_family_env;
use crate::error::StoreResult;
use crate::tables::{LoadSummary, SampleEntry};

pub const FAMILY: &str = "crossref";
pub const DB_METADATA: &str = "crossref_metadata";

/// Reserved key holding the last-indexed watermark.
pub const LAST_INDEXED_KEY: &str = "last-indexed-date";

#[derive(Debug, Clone)]
pub struct CrossrefStore {
    env: Env,
    db: Database<Str, Bytes>,
}

impl CrossrefStore {
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let env = open_family_env(&config.path, FAMILY, config)?;
        let mut wtxn = env.write_txn()?;
        let db = env
            .database_options()
            .types::<Str, Bytes>()
            .name(DB_METADATA)
            .create(&mut wtxn)?;
        wtxn.commit()?;
        Ok(Self { env, db })
    }

    /// Fetch the stored JSON document for a DOI.
    ///
    /// A value that no longer decodes is reported as absent after a warning;
    /// corruption must never take the read path down.
    pub fn get(&self, doi: &str) -> StoreResult<Option<String>> {
        let key = doi.to_lowercase();
        let rtxn = self.env.read_txn()?;
        match self.db.get(&rtxn, &key)? {
            None => Ok(None),
            Some(bytes) => match codec::decode_document(bytes) {
                Ok(json) => Ok(Some(json)),
                Err(e) => {
                    warn!(doi = %key, error = %e, "undecodable crossref value, treating as absent");
                    Ok(None)
                }
            },
        }
    }

    /// Store one document under its lower-cased DOI.
    pub fn put(&self, doi: &str, json: &str) -> StoreResult<()> {
        let key = doi.to_lowercase();
        let bytes = codec::encode_document(json)?;
        let mut wtxn = self.env.write_txn()?;
        self.db.put(&mut wtxn, &key, &bytes)?;
        wtxn.commit()?;
        Ok(())
    }

    /// Batch-load metadata records, committing every `batch_size` writes.
    ///
    /// Records without a string `DOI` field are counted as rejected; they
    /// never abort the load.
    pub fn load<I>(&self, records: I, batch_size: usize) -> StoreResult<LoadSummary>
    where
        I: IntoIterator<Item = serde_json::Value>,
    {
        let mut summary = LoadSummary::default();
        let mut wtxn = self.env.write_txn()?;
        let mut in_batch = 0usize;

        for record in records {
            summary.read += 1;
            let Some(doi) = record.get("DOI").and_then(|d| d.as_str()) else {
                summary.rejected += 1;
                continue;
            };
            let key = doi.to_lowercase();
            let bytes = codec::encode_document(&record.to_string())?;
            self.db.put(&mut wtxn, &key, &bytes)?;
            summary.stored += 1;
            in_batch += 1;

            if in_batch >= batch_size {
                wtxn.commit()?;
                wtxn = self.env.write_txn()?;
                in_batch = 0;
            }
        }

        wtxn.commit()?;
        Ok(summary)
    }

    /// The persisted ingestion watermark, if any load has set one.
    pub fn last_indexed_date(&self) -> StoreResult<Option<String>> {
        let rtxn = self.env.read_txn()?;
        match self.db.get(&rtxn, LAST_INDEXED_KEY)? {
            None => Ok(None),
            Some(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) => Ok(Some(s.to_string())),
                Err(_) => {
                    warn!("watermark value is not UTF-8, treating as absent");
                    Ok(None)
                }
            },
        }
    }

    /// Advance the watermark. A value older than the stored one is ignored,
    /// keeping the watermark monotonically non-decreasing.
    pub fn set_last_indexed_date(&self, date: &str) -> StoreResult<()> {
        if let Some(current) = self.last_indexed_date()? {
            if date < current.as_str() {
                warn!(
                    current = %current,
                    proposed = %date,
                    "refusing to move the watermark backwards"
                );
                return Ok(());
            }
        }
        let mut wtxn = self.env.write_txn()?;
        self.db.put(&mut wtxn, LAST_INDEXED_KEY, date.as_bytes())?;
        wtxn.commit()?;
        Ok(())
    }

    /// Exact number of stored documents, excluding the watermark entry.
    pub fn size(&self) -> StoreResult<u64> {
        let rtxn = self.env.read_txn()?;
        let mut len = self.db.len(&rtxn)?;
        if self.db.get(&rtxn, LAST_INDEXED_KEY)?.is_some() {
            len -= 1;
        }
        Ok(len)
    }

    /// Up to `limit` documents in native key order, for diagnostics.
    pub fn samples(&self, limit: usize) -> StoreResult<Vec<SampleEntry>> {
        let mut out = Vec::new();
        if limit == 0 {
            return Ok(out);
        }
        let rtxn = self.env.read_txn()?;
        for entry in self.db.iter(&rtxn)? {
            let (key, bytes) = entry?;
            if key == LAST_INDEXED_KEY {
                continue;
            }
            match codec::decode_document(bytes) {
                Ok(json) => out.push(SampleEntry {
                    key: key.to_string(),
                    value: json,
                }),
                Err(e) => warn!(doi = %key, error = %e, "skipping undecodable sample"),
            }
            if out.len() >= limit {
                break;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn open_store(dir: &std::path::Path) -> CrossrefStore {
        let config = StoreConfig {
            path: dir.to_path_buf(),
            map_size_gb: 1,
            max_readers: 16,
            batch_size: 100,
        };
        CrossrefStore::open(&config).unwrap()
    }

    #[test]
    fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());

        store.put("10.1/ABC", r#"{"DOI":"10.1/abc"}"#).unwrap();
        // Keys are case-insensitive on the DOI.
        assert_eq!(
            store.get("10.1/abc").unwrap().as_deref(),
            Some(r#"{"DOI":"10.1/abc"}"#)
        );
        assert_eq!(
            store.get("10.1/ABC").unwrap().as_deref(),
            Some(r#"{"DOI":"10.1/abc"}"#)
        );
        assert!(store.get("10.1/other").unwrap().is_none());
    }

    #[test]
    fn test_load_counts_and_rejects() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());

        let records = vec![
            json!({"DOI": "10.1/a", "title": ["A"]}),
            json!({"title": ["no doi"]}),
            json!({"DOI": "10.1/b", "title": ["B"]}),
        ];
        let summary = store.load(records, 2).unwrap();
        assert_eq!(summary.read, 3);
        assert_eq!(summary.stored, 2);
        assert_eq!(summary.rejected, 1);
        assert_eq!(store.size().unwrap(), 2);
    }

    #[test]
    fn test_double_load_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());

        let records = || {
            vec![
                json!({"DOI": "10.1/a", "title": ["A"]}),
                json!({"DOI": "10.1/b", "title": ["B"]}),
            ]
        };
        store.load(records(), 10).unwrap();
        store.load(records(), 10).unwrap();
        assert_eq!(store.size().unwrap(), 2);
    }

    #[test]
    fn test_corrupt_value_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());

        let mut wtxn = store.env.write_txn().unwrap();
        store.db.put(&mut wtxn, "10.1/bad", b"not gzip").unwrap();
        wtxn.commit().unwrap();

        assert!(store.get("10.1/bad").unwrap().is_none());
    }

    #[test]
    fn test_watermark_monotonic_and_durable() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = open_store(dir.path());
            assert!(store.last_indexed_date().unwrap().is_none());
            store
                .set_last_indexed_date("2024-03-01T00:00:00Z")
                .unwrap();
            // An older date must not rewind the watermark.
            store
                .set_last_indexed_date("2023-01-01T00:00:00Z")
                .unwrap();
            assert_eq!(
                store.last_indexed_date().unwrap().as_deref(),
                Some("2024-03-01T00:00:00Z")
            );
        }
        // Survives closing and reopening the environment.
        let store = open_store(dir.path());
        assert_eq!(
            store.last_indexed_date().unwrap().as_deref(),
            Some("2024-03-01T00:00:00Z")
        );
    }

    #[test]
    fn test_size_excludes_watermark() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        store.put("10.1/a", r#"{"DOI":"10.1/a"}"#).unwrap();
        store.set_last_indexed_date("2024-01-01T00:00:00Z").unwrap();
        assert_eq!(store.size().unwrap(), 1);
    }

    #[test]
    fn test_samples_skip_watermark_and_respect_limit() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        for i in 0..5 {
            store
                .put(&format!("10.1/{i}"), &format!(r#"{{"DOI":"10.1/{i}"}}"#))
                .unwrap();
        }
        store.set_last_indexed_date("2024-01-01T00:00:00Z").unwrap();

        let samples = store.samples(3).unwrap();
        assert_eq!(samples.len(), 3);
        assert!(samples.iter().all(|s| s.key != LAST_INDEXED_KEY));
    }
}
