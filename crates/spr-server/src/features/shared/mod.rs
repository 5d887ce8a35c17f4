//! Shared utilities and types for feature modules
//!
//! # Contents
//!
//! - **context**: The per-request handler context cloned into every route
//! - **test_helpers**: Store and context fixtures (test-only)

pub mod context;

#[cfg(test)]
pub mod test_helpers;

// Re-export commonly used types
pub use context::LookupContext;
