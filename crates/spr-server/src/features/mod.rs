//! Feature modules implementing the resolution API
//!
//! Feature slices follow the CQRS (Command Query Responsibility Segregation)
//! pattern: each slice carries its own queries and routes. All write paths
//! live in the ingestion side instead, so the HTTP surface is queries only.
//!
//! # Features
//!
//! - **lookup**: Record resolution by identifiers and bibliographic metadata
//! - **data**: Entry counts and key/value samples from the lookup tables
//!
//! Queries implement the mediator pattern using the `mediator` crate,
//! enabling clean separation of concerns and easy testing.

pub mod data;
pub mod lookup;
pub mod shared;

use axum::Router;

use shared::LookupContext;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// Store, matcher, parser and tuning shared by every handler
    pub ctx: LookupContext,
}

/// Creates the main API router with all feature routes mounted
///
/// Each feature is mounted under its own path prefix:
/// - `/lookup` - Record resolution
/// - `/data` - Table diagnostics
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest("/lookup", lookup::lookup_routes().with_state(state.ctx.clone()))
        .nest("/data", data::data_routes().with_state(state.ctx.clone()))
}
