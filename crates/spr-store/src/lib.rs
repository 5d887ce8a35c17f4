//! Embedded storage layer for the Scholarly Publication Resolver.
//!
//! All identifier-mapping and metadata tables live in LMDB environments
//! under a single base directory, one environment per table family:
//!
//! - `crossref`: DOI → compressed metadata JSON, plus the ingestion
//!   watermark under a reserved key
//! - `pmid`: DOI / PMID / PMC id → [`records::PmidData`]
//! - `istex`: DOI / ISTEX id / PII → [`records::IstexData`]
//! - `hal`: HAL id → compressed metadata JSON, DOI → HAL id pointer
//! - `oa`: DOI → open-access PDF location
//!
//! Readers get snapshot isolation and never block the (single, batch-only)
//! writer. [`tables::LookupStore`] bundles the five families behind one
//! cloneable handle.

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod codec;
pub mod config;
pub mod env;
pub mod error;
pub mod records;
pub mod tables;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use records::{IstexData, PmidData};
pub use tables::{LoadSummary, LookupStore, SampleEntry};
