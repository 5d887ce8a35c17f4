//! PubMed mapping family: three databases keyed by DOI, PMID and PMC id,
//! all pointing at the same [`PmidData`] rows.

use heed3::types::{Bytes, Str};
use heed3::{Database, Env};
use tracing::warn;

use crate::codec::{self, StoredRecord};
use crate::config::StoreConfig;
use crate::env::open_family_env;
use crate::error::StoreResult;
use crate::records::{strip_doi_prefix, PmidData};
use crate::tables::{LoadSummary, SampleEntry};

pub const FAMILY: &str = "pmid";
pub const DB_DOI2IDS: &str = "pmid_doi2ids";
pub const DB_PMID2IDS: &str = "pmid_pmid2ids";
pub const DB_PMC2IDS: &str = "pmid_pmc2ids";

#[derive(Debug, Clone)]
pub struct PmidStore {
    env: Env,
    doi2ids: Database<Str, Bytes>,
    pmid2ids: Database<Str, Bytes>,
    pmc2ids: Database<Str, Bytes>,
}

impl PmidStore {
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let env = open_family_env(&config.path, FAMILY, config)?;
        let mut wtxn = env.write_txn()?;
        let doi2ids = env
            .database_options()
            .types::<Str, Bytes>()
            .name(DB_DOI2IDS)
            .create(&mut wtxn)?;
        let pmid2ids = env
            .database_options()
            .types::<Str, Bytes>()
            .name(DB_PMID2IDS)
            .create(&mut wtxn)?;
        let pmc2ids = env
            .database_options()
            .types::<Str, Bytes>()
            .name(DB_PMC2IDS)
            .create(&mut wtxn)?;
        wtxn.commit()?;
        Ok(Self {
            env,
            doi2ids,
            pmid2ids,
            pmc2ids,
        })
    }

    fn get_from(&self, db: &Database<Str, Bytes>, key: &str) -> StoreResult<Option<PmidData>> {
        let rtxn = self.env.read_txn()?;
        match db.get(&rtxn, key)? {
            None => Ok(None),
            Some(bytes) => match codec::decode_pmid(bytes) {
                Ok(row) => Ok(Some(row)),
                Err(e) => {
                    warn!(key = %key, error = %e, "undecodable pmid row, treating as absent");
                    Ok(None)
                }
            },
        }
    }

    pub fn get_by_pmid(&self, pmid: &str) -> StoreResult<Option<PmidData>> {
        self.get_from(&self.pmid2ids, pmid)
    }

    /// Exact lookup; callers normalize the `PMC` prefix first.
    pub fn get_by_pmc(&self, pmc: &str) -> StoreResult<Option<PmidData>> {
        self.get_from(&self.pmc2ids, pmc)
    }

    pub fn get_by_doi(&self, doi: &str) -> StoreResult<Option<PmidData>> {
        self.get_from(&self.doi2ids, &strip_doi_prefix(doi).to_lowercase())
    }

    /// Batch-load mapping rows, writing each row under every identifier it
    /// carries. Rows with no identifier at all are counted as rejected.
    pub fn load<I>(&self, rows: I, batch_size: usize) -> StoreResult<LoadSummary>
    where
        I: IntoIterator<Item = PmidData>,
    {
        let mut summary = LoadSummary::default();
        let mut wtxn = self.env.write_txn()?;
        let mut in_batch = 0usize;

        for row in rows {
            summary.read += 1;
            if row.is_empty() {
                summary.rejected += 1;
                continue;
            }
            let bytes = codec::encode_record(&StoredRecord::Pmid(row.clone()))?;
            if let Some(pmid) = &row.pmid {
                self.pmid2ids.put(&mut wtxn, pmid, &bytes)?;
            }
            if let Some(pmcid) = &row.pmcid {
                self.pmc2ids.put(&mut wtxn, pmcid, &bytes)?;
            }
            if let Some(doi) = &row.doi {
                let key = strip_doi_prefix(doi).to_lowercase();
                self.doi2ids.put(&mut wtxn, &key, &bytes)?;
            }
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

    pub fn sizes(&self) -> StoreResult<[(&'static str, u64); 3]> {
        let rtxn = self.env.read_txn()?;
        Ok([
            (DB_DOI2IDS, self.doi2ids.len(&rtxn)?),
            (DB_PMID2IDS, self.pmid2ids.len(&rtxn)?),
            (DB_PMC2IDS, self.pmc2ids.len(&rtxn)?),
        ])
    }

    pub fn samples_by_pmid(&self, limit: usize) -> StoreResult<Vec<SampleEntry>> {
        self.samples_from(&self.pmid2ids, limit)
    }

    pub fn samples_by_doi(&self, limit: usize) -> StoreResult<Vec<SampleEntry>> {
        self.samples_from(&self.doi2ids, limit)
    }

    pub fn samples_by_pmc(&self, limit: usize) -> StoreResult<Vec<SampleEntry>> {
        self.samples_from(&self.pmc2ids, limit)
    }

    fn samples_from(&self, db: &Database<Str, Bytes>, limit: usize) -> StoreResult<Vec<SampleEntry>> {
        let mut out = Vec::new();
        if limit == 0 {
            return Ok(out);
        }
        let rtxn = self.env.read_txn()?;
        for entry in db.iter(&rtxn)? {
            let (key, bytes) = entry?;
            match codec::decode_pmid(bytes) {
                Ok(row) => out.push(SampleEntry {
                    key: key.to_string(),
                    value: serde_json::to_string(&row).unwrap_or_default(),
                }),
                Err(e) => warn!(key = %key, error = %e, "skipping undecodable sample"),
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

    fn open_store(dir: &std::path::Path) -> PmidStore {
        let config = StoreConfig {
            path: dir.to_path_buf(),
            map_size_gb: 1,
            max_readers: 16,
            batch_size: 100,
        };
        PmidStore::open(&config).unwrap()
    }

    fn full_row() -> PmidData {
        PmidData {
            pmid: Some("29301959".to_string()),
            pmcid: Some("PMC5743050".to_string()),
            doi: Some("10.1038/s41598-017-18482-9".to_string()),
            license: Some("cc by".to_string()),
            subpath: None,
        }
    }

    #[test]
    fn test_row_reachable_by_every_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        store.load([full_row()], 10).unwrap();

        let by_pmid = store.get_by_pmid("29301959").unwrap().unwrap();
        let by_pmc = store.get_by_pmc("PMC5743050").unwrap().unwrap();
        let by_doi = store.get_by_doi("10.1038/S41598-017-18482-9").unwrap().unwrap();

        // Alias convergence: every key yields the identical row.
        assert_eq!(by_pmid, by_pmc);
        assert_eq!(by_pmid, by_doi);
        assert_eq!(by_pmid, full_row());
    }

    #[test]
    fn test_doi_resolver_prefix_is_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        let row = PmidData {
            doi: Some("https://doi.org/10.1/x".to_string()),
            pmid: Some("1".to_string()),
            ..PmidData::default()
        };
        store.load([row], 10).unwrap();
        assert!(store.get_by_doi("10.1/x").unwrap().is_some());
        assert!(store.get_by_doi("https://doi.org/10.1/X").unwrap().is_some());
    }

    #[test]
    fn test_empty_rows_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        let summary = store
            .load([PmidData::default(), full_row()], 10)
            .unwrap();
        assert_eq!(summary.read, 2);
        assert_eq!(summary.stored, 1);
        assert_eq!(summary.rejected, 1);
    }

    #[test]
    fn test_double_load_leaves_sizes_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        store.load([full_row()], 10).unwrap();
        let before = store.sizes().unwrap();
        store.load([full_row()], 10).unwrap();
        assert_eq!(store.sizes().unwrap(), before);
    }

    #[test]
    fn test_samples_render_rows_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        store.load([full_row()], 10).unwrap();

        let samples = store.samples_by_pmid(10).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].key, "29301959");
        assert!(samples[0].value.contains("PMC5743050"));
    }
}
