//! Common error types shared across the SPR crates.

use thiserror::Error;

/// Errors that can cross crate boundaries inside the workspace.
///
/// Crate-local concerns (the store, the HTTP surface) define their own
/// richer enums and convert into this one at the seams where a shared
/// vocabulary is enough.
#[derive(Error, Debug)]
pub enum SprError {
    /// I/O failure (file system, pipes)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Compressed payload could not be produced or unpacked
    #[error("Compression error: {0}")]
    Compression(String),

    /// Storage layer failure surfaced without its concrete cause
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream network failure
    #[error("Network error: {0}")]
    Network(String),

    /// Malformed input that could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result alias using [`SprError`].
pub type Result<T> = std::result::Result<T, SprError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing dump");
        let err: SprError = io.into();
        assert!(matches!(err, SprError::Io(_)));
        assert!(err.to_string().contains("missing dump"));
    }

    #[test]
    fn serde_errors_convert() {
        let bad = serde_json::from_str::<serde_json::Value>("{not json");
        let err: SprError = bad.unwrap_err().into();
        assert!(matches!(err, SprError::Serialization(_)));
    }

    #[test]
    fn display_is_prefixed() {
        let err = SprError::Config("SEARCH_HOST is empty".to_string());
        assert_eq!(err.to_string(), "Configuration error: SEARCH_HOST is empty");
    }
}
