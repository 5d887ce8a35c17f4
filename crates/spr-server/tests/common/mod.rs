//! Shared fixtures for the HTTP API tests.

use spr_server::api;
use spr_server::config::Config;
use spr_server::features::shared::LookupContext;
use spr_server::features::FeatureState;
use spr_store::{LookupStore, StoreConfig};
use tempfile::TempDir;

/// Open a throwaway store rooted in `dir`.
pub fn open_store(dir: &TempDir) -> LookupStore {
    let config = StoreConfig {
        path: dir.path().to_path_buf(),
        map_size_gb: 1,
        max_readers: 16,
        batch_size: 100,
    };
    LookupStore::open(&config).expect("store")
}

/// Assemble the full router over `store`, matching against `search_host`.
///
/// No parser host is configured, so raw-string resolution skips citation
/// pre-parsing and goes straight to the `bibliographic` field.
pub fn build_app(store: LookupStore, search_host: &str) -> axum::Router {
    let mut config = Config::default();
    config.search.host = search_host.to_string();
    config.server.request_timeout_secs = 5;
    let ctx = LookupContext::new(&config, store).expect("context");
    api::create_router(FeatureState { ctx }, &config)
}
