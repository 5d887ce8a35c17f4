//! SPR Ingest Library
//!
//! Out-of-band operations for the lookup service:
//!
//! - **Bulk loads**: feed the Crossref, PMID, ISTEX, HAL and Unpaywall dumps
//!   into the LMDB lookup tables (`spr-ingest load <table> --input <path>`)
//! - **Index rebuilds**: ship a metadata dump to the blocking index
//!   (`spr-ingest index --input <path>`)
//! - **Incremental updates**: one-shot change-feed runs
//!   (`spr-ingest update [--daily]`)
//! - **Diagnostics**: entry counts per table (`spr-ingest sizes`)
//!
//! The service schedules its own daily updates; this binary covers initial
//! loads and manual catch-up after downtime.

pub mod commands;
pub mod progress;
