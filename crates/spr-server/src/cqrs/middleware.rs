//! Request classification markers
//!
//! Every mediator request declares which side of the CQRS split it sits on.
//! The HTTP surface is read-only, so all registered handlers are [`Query`]
//! implementors; ingestion runs are the command side and execute out-of-band
//! through the scheduler or the `spr-ingest` binary instead of the mediator.

/// Marker for read-only requests. Handlers may only open read transactions.
pub trait Query {}

/// Marker for mutating requests. Handlers own the single write transaction
/// for their table family while they run.
pub trait Command {}
