//! Lookup-table families.
//!
//! Each submodule owns one LMDB environment and the named databases of its
//! family. [`LookupStore`] opens all of them under one base directory and is
//! the handle the service and the ingest binary share.

pub mod crossref;
pub mod hal;
pub mod istex;
pub mod oa;
pub mod pmid;

use std::collections::BTreeMap;

use serde::Serialize;

pub use crossref::CrossrefStore;
pub use hal::HalStore;
pub use istex::IstexStore;
pub use oa::OaStore;
pub use pmid::PmidStore;

use crate::config::StoreConfig;
use crate::error::StoreResult;

/// Counters accumulated over one batch load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    /// Records taken from the input
    pub read: u64,
    /// Records written to at least one database
    pub stored: u64,
    /// Records dropped for missing keys
    pub rejected: u64,
}

impl LoadSummary {
    pub fn absorb(&mut self, other: LoadSummary) {
        self.read += other.read;
        self.stored += other.stored;
        self.rejected += other.rejected;
    }
}

/// One diagnostic key/value pair from a table dump.
#[derive(Debug, Clone, Serialize)]
pub struct SampleEntry {
    pub key: String,
    pub value: String,
}

/// All five table families behind one cloneable handle.
///
/// Cloning shares the underlying environments; handles are safe to move
/// across tasks and threads.
#[derive(Debug, Clone)]
pub struct LookupStore {
    pub crossref: CrossrefStore,
    pub pmid: PmidStore,
    pub istex: IstexStore,
    pub hal: HalStore,
    pub oa: OaStore,
}

impl LookupStore {
    /// Open every family environment under the configured base directory.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        config.validate()?;

        Ok(Self {
            crossref: CrossrefStore::open(config)?,
            pmid: PmidStore::open(config)?,
            istex: IstexStore::open(config)?,
            hal: HalStore::open(config)?,
            oa: OaStore::open(config)?,
        })
    }

    /// Exact entry counts for every named database, keyed by database name.
    pub fn sizes(&self) -> StoreResult<BTreeMap<String, u64>> {
        let mut sizes = BTreeMap::new();
        sizes.insert(crossref::DB_METADATA.to_string(), self.crossref.size()?);
        for (name, len) in self.pmid.sizes()? {
            sizes.insert(name.to_string(), len);
        }
        for (name, len) in self.istex.sizes()? {
            sizes.insert(name.to_string(), len);
        }
        for (name, len) in self.hal.sizes()? {
            sizes.insert(name.to_string(), len);
        }
        sizes.insert(oa::DB_DOI2URL.to_string(), self.oa.size()?);
        Ok(sizes)
    }
}
