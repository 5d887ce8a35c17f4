//! Shared utilities for the Scholarly Publication Resolver workspace.
//!
//! This crate provides the pieces every other SPR crate leans on:
//!
//! - [`error`]: the common error type and result alias
//! - [`logging`]: tracing-based logging bootstrap (console, file, or both)
//! - [`compress`]: gzip helpers for stored values and archive pages

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod compress;
pub mod error;
pub mod logging;

pub use error::{Result, SprError};
