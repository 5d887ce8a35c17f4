//! Diagnostic data endpoints
//!
//! Entry counts and key/value samples straight out of the lookup tables,
//! for checking what a load run actually put on disk.

pub mod queries;
pub mod routes;

pub use queries::{SampleTarget, TableSamplesQuery, TableSizesQuery};
pub use routes::data_routes;
