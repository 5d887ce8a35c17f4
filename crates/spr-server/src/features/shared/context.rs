//! Shared request-handling context
//!
//! One [`LookupContext`] is built at startup and cloned into every route.
//! Cloning is cheap: the store shares LMDB environment handles and the
//! matching service shares a reqwest connection pool.

use std::time::Duration;

use spr_store::LookupStore;

use crate::config::{Config, MatchingConfig};
use crate::matching::MatchingService;
use crate::parser::GrobidClient;

/// Everything a resolution or diagnostic handler needs.
#[derive(Debug, Clone)]
pub struct LookupContext {
    /// Embedded lookup tables (metadata payloads and identifier mappings).
    pub store: LookupStore,
    /// Client for the external blocking index.
    pub matcher: MatchingService,
    /// Optional citation parser; `None` when no GROBID host is configured.
    pub parser: Option<GrobidClient>,
    /// Blocking and post-validation tuning.
    pub matching: MatchingConfig,
    /// Wall-clock bound on a single resolution request.
    pub request_timeout: Duration,
}

impl LookupContext {
    /// Assemble the context from loaded configuration and an open store.
    pub fn new(config: &Config, store: LookupStore) -> anyhow::Result<Self> {
        let matcher = MatchingService::new(&config.search, &config.matching)?;
        let parser = match &config.grobid.host {
            Some(host) => Some(GrobidClient::new(host)?),
            None => None,
        };

        Ok(Self {
            store,
            matcher,
            parser,
            matching: config.matching.clone(),
            request_timeout: Duration::from_secs(config.server.request_timeout_secs),
        })
    }
}
