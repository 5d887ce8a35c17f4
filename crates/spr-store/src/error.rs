//! Storage error types.

use thiserror::Error;

use crate::codec::CodecError;

/// Errors raised by the storage layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// LMDB environment or transaction failure
    #[error("Environment error: {0}")]
    Env(#[from] heed3::Error),

    /// Underlying file system failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be encoded for storage
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Store configuration is invalid. Check STORE_PATH and related settings.
    #[error("Store configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// True when the error means the environment ran out of reader slots.
    ///
    /// The service maps this to an admission-control rejection (503) rather
    /// than an internal error: it clears as soon as in-flight readers drain.
    pub fn is_overloaded(&self) -> bool {
        matches!(
            self,
            StoreError::Env(heed3::Error::Mdb(heed3::MdbError::ReadersFull))
        )
    }
}

/// Result alias using [`StoreError`].
pub type StoreResult<T> = Result<T, StoreError>;
