//! ISTEX alias family: databases keyed by DOI, ISTEX id and PII, pointing
//! at the same [`IstexData`] bundles. One bundle may be filed under several
//! DOIs and PIIs.

use heed3::types::{Bytes, Str};
use heed3::{Database, Env};
use tracing::warn;

use crate::codec::{self, StoredRecord};
use crate::config::StoreConfig;
use crate::env::open_family_env;
use crate::error::StoreResult;
use crate::records::IstexData;
use crate::tables::{LoadSummary, SampleEntry};

pub const FAMILY: &str = "istex";
pub const DB_DOI2IDS: &str = "istex_doi2ids";
pub const DB_ISTEX2IDS: &str = "istex_istex2ids";
pub const DB_PII2IDS: &str = "istex_pii2ids";

#[derive(Debug, Clone)]
pub struct IstexStore {
    env: Env,
    doi2ids: Database<Str, Bytes>,
    istex2ids: Database<Str, Bytes>,
    pii2ids: Database<Str, Bytes>,
}

impl IstexStore {
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let env = open_family_env(&config.path, FAMILY, config)?;
        let mut wtxn = env.write_txn()?;
        let doi2ids = env
            .database_options()
            .types::<Str, Bytes>()
            .name(DB_DOI2IDS)
            .create(&mut wtxn)?;
        let istex2ids = env
            .database_options()
            .types::<Str, Bytes>()
            .name(DB_ISTEX2IDS)
            .create(&mut wtxn)?;
        let pii2ids = env
            .database_options()
            .types::<Str, Bytes>()
            .name(DB_PII2IDS)
            .create(&mut wtxn)?;
        wtxn.commit()?;
        Ok(Self {
            env,
            doi2ids,
            istex2ids,
            pii2ids,
        })
    }

    fn get_from(&self, db: &Database<Str, Bytes>, key: &str) -> StoreResult<Option<IstexData>> {
        let rtxn = self.env.read_txn()?;
        match db.get(&rtxn, key)? {
            None => Ok(None),
            Some(bytes) => match codec::decode_istex(bytes) {
                Ok(bundle) => Ok(Some(bundle)),
                Err(e) => {
                    warn!(key = %key, error = %e, "undecodable istex bundle, treating as absent");
                    Ok(None)
                }
            },
        }
    }

    pub fn get_by_doi(&self, doi: &str) -> StoreResult<Option<IstexData>> {
        self.get_from(&self.doi2ids, &doi.to_lowercase())
    }

    /// ISTEX ids are case-significant and looked up as supplied.
    pub fn get_by_istex_id(&self, istex_id: &str) -> StoreResult<Option<IstexData>> {
        self.get_from(&self.istex2ids, istex_id)
    }

    pub fn get_by_pii(&self, pii: &str) -> StoreResult<Option<IstexData>> {
        self.get_from(&self.pii2ids, &pii.to_lowercase())
    }

    /// Batch-load alias bundles under every key they carry.
    pub fn load<I>(&self, bundles: I, batch_size: usize) -> StoreResult<LoadSummary>
    where
        I: IntoIterator<Item = IstexData>,
    {
        let mut summary = LoadSummary::default();
        let mut wtxn = self.env.write_txn()?;
        let mut in_batch = 0usize;

        for bundle in bundles {
            summary.read += 1;
            if bundle.is_empty() {
                summary.rejected += 1;
                continue;
            }
            let bytes = codec::encode_record(&StoredRecord::Istex(bundle.clone()))?;
            for doi in &bundle.doi {
                self.doi2ids.put(&mut wtxn, &doi.to_lowercase(), &bytes)?;
            }
            if let Some(istex_id) = &bundle.istex_id {
                self.istex2ids.put(&mut wtxn, istex_id, &bytes)?;
            }
            for pii in &bundle.pii {
                self.pii2ids.put(&mut wtxn, &pii.to_lowercase(), &bytes)?;
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
            (DB_ISTEX2IDS, self.istex2ids.len(&rtxn)?),
            (DB_PII2IDS, self.pii2ids.len(&rtxn)?),
        ])
    }

    pub fn samples_by_doi(&self, limit: usize) -> StoreResult<Vec<SampleEntry>> {
        self.samples_from(&self.doi2ids, limit)
    }

    pub fn samples_by_istex_id(&self, limit: usize) -> StoreResult<Vec<SampleEntry>> {
        self.samples_from(&self.istex2ids, limit)
    }

    pub fn samples_by_pii(&self, limit: usize) -> StoreResult<Vec<SampleEntry>> {
        self.samples_from(&self.pii2ids, limit)
    }

    fn samples_from(&self, db: &Database<Str, Bytes>, limit: usize) -> StoreResult<Vec<SampleEntry>> {
        let mut out = Vec::new();
        if limit == 0 {
            return Ok(out);
        }
        let rtxn = self.env.read_txn()?;
        for entry in db.iter(&rtxn)? {
            let (key, bytes) = entry?;
            match codec::decode_istex(bytes) {
                Ok(bundle) => out.push(SampleEntry {
                    key: key.to_string(),
                    value: serde_json::to_string(&bundle).unwrap_or_default(),
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
