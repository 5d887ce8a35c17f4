//! Query handlers for record resolution

pub mod resolve_record;

pub use resolve_record::ResolveRecordQuery;
