//! Metadata matching against the search index.
//!
//! When no strong identifier resolves a request, the remaining route is a
//! blocking query against the Elasticsearch-compatible index: a small block
//! of candidate records is retrieved, hydrated from the embedded store, and
//! re-ranked against whatever metadata the caller supplied. [`MatchingService`]
//! owns the search client, [`ranking`] the pairwise scoring.

pub mod query;
pub mod ranking;
pub mod service;

use thiserror::Error;

pub use query::BiblioFilter;
pub use ranking::ReferenceRecord;
pub use service::MatchingService;

/// One hydrated hit from a blocking query.
///
/// `blocking_score` is the normalized search score, `matching_score` the
/// pairwise distance filled in by [`ranking::rank`]. `payload` is the full
/// metadata JSON fetched from the store.
#[derive(Debug, Clone, Default)]
pub struct MatchCandidate {
    pub record_id: Option<String>,
    pub doi: Option<String>,
    pub hal_id: Option<String>,
    pub title: Option<String>,
    pub first_author: Option<String>,
    pub journal: Option<String>,
    pub abbreviated_journal: Option<String>,
    pub year: Option<String>,
    pub blocking_score: f64,
    pub matching_score: f64,
    pub payload: String,
}

/// Failures of a blocking query.
#[derive(Debug, Error)]
pub enum MatchingError {
    /// The block came back empty, or nothing in it could be hydrated.
    /// Not retryable, safe to report as a plain miss.
    #[error("{0}")]
    NoMatch(String),

    /// The search backend was unreachable or answered outside 2xx. The
    /// index state is unknown, so callers must not treat this as a miss.
    #[error("{0}")]
    Upstream(String),

    /// A table read failed while hydrating hits.
    #[error(transparent)]
    Storage(#[from] spr_store::StoreError),
}
