//! Query handlers for the diagnostic data endpoints

pub mod table_samples;
pub mod table_sizes;

pub use table_samples::{SampleTarget, TableSamplesQuery};
pub use table_sizes::TableSizesQuery;
