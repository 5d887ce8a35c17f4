//! Open-access family: lower-cased DOI → best OA PDF location.

use heed3::types::{Bytes, Str};
use heed3::{Database, Env};
use tracing::warn;

use crate::config::StoreConfig;
use crate::env::open_family_env;
use crate::error::StoreResult;
use crate::tables::{LoadSummary, SampleEntry};

pub const FAMILY: &str = "oa";
pub const DB_DOI2URL: &str = "oa_doi2url";

#[derive(Debug, Clone)]
pub struct OaStore {
    env: Env,
    doi2url: Database<Str, Bytes>,
}

impl OaStore {
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let env = open_family_env(&config.path, FAMILY, config)?;
        let mut wtxn = env.write_txn()?;
        let doi2url = env
            .database_options()
            .types::<Str, Bytes>()
            .name(DB_DOI2URL)
            .create(&mut wtxn)?;
        wtxn.commit()?;
        Ok(Self { env, doi2url })
    }

    pub fn get_oa_link(&self, doi: &str) -> StoreResult<Option<String>> {
        let key = doi.to_lowercase();
        let rtxn = self.env.read_txn()?;
        match self.doi2url.get(&rtxn, &key)? {
            None => Ok(None),
            Some(bytes) => match std::str::from_utf8(bytes) {
                Ok(url) => Ok(Some(url.to_string())),
                Err(_) => {
                    warn!(doi = %key, "oa link is not UTF-8, treating as absent");
                    Ok(None)
                }
            },
        }
    }

    pub fn put(&self, doi: &str, url: &str) -> StoreResult<()> {
        let mut wtxn = self.env.write_txn()?;
        self.doi2url
            .put(&mut wtxn, &doi.to_lowercase(), url.as_bytes())?;
        wtxn.commit()?;
        Ok(())
    }

    /// Batch-load `(doi, url)` pairs.
    pub fn load<I>(&self, pairs: I, batch_size: usize) -> StoreResult<LoadSummary>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut summary = LoadSummary::default();
        let mut wtxn = self.env.write_txn()?;
        let mut in_batch = 0usize;

        for (doi, url) in pairs {
            summary.read += 1;
            if doi.is_empty() || url.is_empty() {
                summary.rejected += 1;
                continue;
            }
            self.doi2url
                .put(&mut wtxn, &doi.to_lowercase(), url.as_bytes())?;
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

    pub fn size(&self) -> StoreResult<u64> {
        let rtxn = self.env.read_txn()?;
        Ok(self.doi2url.len(&rtxn)?)
    }

    pub fn samples(&self, limit: usize) -> StoreResult<Vec<SampleEntry>> {
        let mut out = Vec::new();
        if limit == 0 {
            return Ok(out);
        }
        let rtxn = self.env.read_txn()?;
        for entry in self.doi2url.iter(&rtxn)? {
            let (key, bytes) = entry?;
            out.push(SampleEntry {
                key: key.to_string(),
                value: String::from_utf8_lossy(bytes).into_owned(),
            });
            if out.len() >= limit {
                break;
            }
        }
        Ok(out)
    }
}
