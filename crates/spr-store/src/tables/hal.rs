//! HAL family: HAL id → compressed metadata JSON, plus a DOI → HAL id
//! pointer so the cascade can reach HAL records from a Crossref DOI.

use heed3::types::{Bytes, Str};
use heed3::{Database, Env};
use tracing::warn;

use crate::codec;
use crate::config::StoreConfig;
use crate::env::open_family_env;
use crate::error::StoreResult;
use crate::tables::{LoadSummary, SampleEntry};

pub const FAMILY: &str = "hal";
pub const DB_METADATA: &str = "hal_metadata";
pub const DB_DOI2HAL: &str = "hal_doi2hal";

#[derive(Debug, Clone)]
pub struct HalStore {
    env: Env,
    metadata: Database<Str, Bytes>,
    doi2hal: Database<Str, Bytes>,
}

impl HalStore {
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let env = open_family_env(&config.path, FAMILY, config)?;
        let mut wtxn = env.write_txn()?;
        let metadata = env
            .database_options()
            .types::<Str, Bytes>()
            .name(DB_METADATA)
            .create(&mut wtxn)?;
        let doi2hal = env
            .database_options()
            .types::<Str, Bytes>()
            .name(DB_DOI2HAL)
            .create(&mut wtxn)?;
        wtxn.commit()?;
        Ok(Self {
            env,
            metadata,
            doi2hal,
        })
    }

    /// Fetch the stored JSON document for a HAL id.
    pub fn get_by_hal_id(&self, hal_id: &str) -> StoreResult<Option<String>> {
        let key = hal_id.to_lowercase();
        let rtxn = self.env.read_txn()?;
        match self.metadata.get(&rtxn, &key)? {
            None => Ok(None),
            Some(bytes) => match codec::decode_document(bytes) {
                Ok(json) => Ok(Some(json)),
                Err(e) => {
                    warn!(hal_id = %key, error = %e, "undecodable hal value, treating as absent");
                    Ok(None)
                }
            },
        }
    }

    /// The HAL id filed for a DOI, when the deposit declared one.
    pub fn hal_id_for_doi(&self, doi: &str) -> StoreResult<Option<String>> {
        let key = doi.to_lowercase();
        let rtxn = self.env.read_txn()?;
        match self.doi2hal.get(&rtxn, &key)? {
            None => Ok(None),
            Some(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) => Ok(Some(s.to_string())),
                Err(_) => {
                    warn!(doi = %key, "hal pointer is not UTF-8, treating as absent");
                    Ok(None)
                }
            },
        }
    }

    /// Store one document under its lower-cased HAL id, wiring the DOI
    /// pointer when present.
    pub fn put(&self, hal_id: &str, doi: Option<&str>, json: &str) -> StoreResult<()> {
        let key = hal_id.to_lowercase();
        let bytes = codec::encode_document(json)?;
        let mut wtxn = self.env.write_txn()?;
        self.metadata.put(&mut wtxn, &key, &bytes)?;
        if let Some(doi) = doi {
            self.doi2hal
                .put(&mut wtxn, &doi.to_lowercase(), key.as_bytes())?;
        }
        wtxn.commit()?;
        Ok(())
    }

    /// Batch-load HAL documents. A record must carry a string `halId`;
    /// the DOI pointer is taken from `doi` (or `DOI`) when present.
    pub fn load<I>(&self, records: I, batch_size: usize) -> StoreResult<LoadSummary>
    where
        I: IntoIterator<Item = serde_json::Value>,
    {
        let mut summary = LoadSummary::default();
        let mut wtxn = self.env.write_txn()?;
        let mut in_batch = 0usize;

        for record in records {
            summary.read += 1;
            let Some(hal_id) = record.get("halId").and_then(|v| v.as_str()) else {
                summary.rejected += 1;
                continue;
            };
            let key = hal_id.to_lowercase();
            let doi = record
                .get("doi")
                .or_else(|| record.get("DOI"))
                .and_then(|v| v.as_str())
                .map(str::to_lowercase);
            let bytes = codec::encode_document(&record.to_string())?;
            self.metadata.put(&mut wtxn, &key, &bytes)?;
            if let Some(doi) = doi {
                self.doi2hal.put(&mut wtxn, &doi, key.as_bytes())?;
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

    pub fn sizes(&self) -> StoreResult<[(&'static str, u64); 2]> {
        let rtxn = self.env.read_txn()?;
        Ok([
            (DB_METADATA, self.metadata.len(&rtxn)?),
            (DB_DOI2HAL, self.doi2hal.len(&rtxn)?),
        ])
    }

    pub fn samples_by_hal_id(&self, limit: usize) -> StoreResult<Vec<SampleEntry>> {
        let mut out = Vec::new();
        if limit == 0 {
            return Ok(out);
        }
        let rtxn = self.env.read_txn()?;
        for entry in self.metadata.iter(&rtxn)? {
            let (key, bytes) = entry?;
            match codec::decode_document(bytes) {
                Ok(json) => out.push(SampleEntry {
                    key: key.to_string(),
                    value: json,
                }),
                Err(e) => warn!(hal_id = %key, error = %e, "skipping undecodable sample"),
            }
            if out.len() >= limit {
                break;
            }
        }
        Ok(out)
    }

    pub fn samples_by_doi(&self, limit: usize) -> StoreResult<Vec<SampleEntry>> {
        let mut out = Vec::new();
        if limit == 0 {
            return Ok(out);
        }
        let rtxn = self.env.read_txn()?;
        for entry in self.doi2hal.iter(&rtxn)? {
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
