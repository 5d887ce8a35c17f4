//! Record resolution feature
//!
//! Resolves any mix of strong identifiers and partial bibliographic
//! metadata to the canonical cross-referenced record. The cascade itself
//! lives in [`strategy`], alias injection in [`enrich`].

pub mod enrich;
pub mod queries;
pub mod routes;
pub mod strategy;

pub use queries::ResolveRecordQuery;
pub use routes::lookup_routes;
pub use strategy::{BranchFailure, StrategyKind};
