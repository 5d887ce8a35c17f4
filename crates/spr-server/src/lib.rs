//! SPR Server Library
#![recursion_limit = "256"]
//!
//! HTTP service resolving scholarly-publication identifiers.
//!
//! # Overview
//!
//! The SPR server answers one question: given any combination of strong
//! identifiers (DOI, HAL id, PMID, PMC id, PII, ISTEX id) and/or partial
//! bibliographic metadata (title, first author, journal, volume, first page,
//! year, raw citation string), return the canonical cross-referenced metadata
//! record for that publication.
//!
//! - **Lookup cascade**: strong identifiers first, in fixed priority order,
//!   then progressively fuzzier matching against an external search index,
//!   with alias enrichment on success.
//! - **Embedded storage**: LMDB lookup tables managed by `spr-store`.
//! - **Ingestion**: bulk dump readers plus an incremental loader paging the
//!   Crossref change feed with watermark tracking and a daily scheduler.
//! - **Configuration**: environment-based configuration management.
//! - **Middleware**: CORS and request logging.
//!
//! # Architecture
//!
//! Read and write paths never meet in a request: resolution handlers only
//! open read transactions, while all writes happen in ingestion tasks. The
//! HTTP surface follows a **CQRS**-flavored vertical-slice layout:
//!
//! - **Queries** (`features/lookup`, `features/data`): resolution and
//!   diagnostic reads, executed via HTTP GET.
//! - **Commands**: ingestion runs, executed out-of-band by the scheduler or
//!   the `spr-ingest` binary rather than over HTTP.
//!
//! ## Framework Stack
//!
//! - **Axum**: Modern, ergonomic web framework
//! - **heed**: LMDB bindings with typed databases
//! - **Tower**: Middleware and service abstractions
//!
//! # Example
//!
//! ```no_run
//! use spr_server::config::Config;
//! use spr_store::LookupStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let store = LookupStore::open(&config.store)?;
//!     spr_server::api::serve(config, store).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod cqrs;
pub mod error;
pub mod features;
pub mod ingest;
pub mod matching;
pub mod middleware;
pub mod parser;

// Re-export commonly used types
pub use error::{ServiceError, ServiceResult};
