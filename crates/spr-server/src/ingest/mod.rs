//! Dump loading and change-feed ingestion.
//!
//! [`readers`] turns the source dumps into validated record streams,
//! [`feed`] talks to the Crossref REST API, [`indexer`] ships blocking
//! documents to the search backend, and [`loader`] plus [`scheduler`] drive
//! the incremental update runs the server schedules at startup.

pub mod feed;
pub mod indexer;
pub mod loader;
pub mod readers;
pub mod scheduler;

pub use indexer::{IndexSummary, SearchIndexer};
pub use loader::{IncrementalLoader, RunKind, RunSummary};
