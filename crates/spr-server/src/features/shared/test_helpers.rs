//! Test fixtures for route and strategy tests
//!
//! Opens throwaway stores under a tempdir and assembles a [`LookupContext`]
//! pointed at whatever mock search backend a test spins up.

use std::time::Duration;

use spr_store::{LookupStore, StoreConfig};
use tempfile::TempDir;

use crate::config::{MatchingConfig, SearchConfig};
use crate::matching::MatchingService;

use super::LookupContext;

/// Open a small store rooted in `dir`.
pub fn test_store(dir: &TempDir) -> LookupStore {
    let config = StoreConfig {
        path: dir.path().to_path_buf(),
        map_size_gb: 1,
        max_readers: 16,
        batch_size: 100,
    };
    LookupStore::open(&config).unwrap()
}

/// Build a context over `store` whose matcher queries `search_host`.
///
/// No citation parser is wired in; tests that exercise the parser path attach
/// one themselves.
pub fn test_context(store: LookupStore, search_host: &str) -> LookupContext {
    let search = SearchConfig {
        host: search_host.to_string(),
        index: "crossref".to_string(),
        indexing_batch_size: 500,
    };
    let matching = MatchingConfig {
        block_size: 4,
        validation_threshold: 0.7,
    };
    let matcher = MatchingService::new(&search, &matching).unwrap();

    LookupContext {
        store,
        matcher,
        parser: None,
        matching,
        request_timeout: Duration::from_secs(5),
    }
}
