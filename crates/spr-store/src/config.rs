//! Store configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Default base directory for the LMDB environments.
pub const DEFAULT_STORE_PATH: &str = "data/db";

/// Default mapped size per environment, in GiB.
///
/// LMDB maps are sparse; the file only grows with actual data, so a large
/// ceiling costs nothing until the dumps arrive.
pub const DEFAULT_MAP_SIZE_GB: usize = 1024;

/// Default bound on concurrent reader slots per environment.
///
/// This doubles as the admission-control limit: when all slots are taken the
/// service answers 503 instead of queueing.
pub const DEFAULT_MAX_READERS: u32 = 512;

/// Named databases allowed per environment.
pub const DEFAULT_MAX_DBS: u32 = 8;

/// Records written per commit window during batch loads.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Settings for opening the storage environments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base directory; each table family gets a subdirectory
    pub path: PathBuf,
    /// Mapped size per environment, in GiB
    pub map_size_gb: usize,
    /// Concurrent reader slots per environment
    pub max_readers: u32,
    /// Records per commit window during batch loads
    pub batch_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_PATH),
            map_size_gb: DEFAULT_MAP_SIZE_GB,
            max_readers: DEFAULT_MAX_READERS,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl StoreConfig {
    /// Read the configuration from `STORE_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = StoreConfig::default();

        Self {
            path: std::env::var("STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.path),
            map_size_gb: std::env::var("STORE_MAP_SIZE_GB")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.map_size_gb),
            max_readers: std::env::var("STORE_MAX_READERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_readers),
            batch_size: std::env::var("STORE_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.batch_size),
        }
    }

    /// Reject configurations that cannot open a usable environment.
    pub fn validate(&self) -> StoreResult<()> {
        if self.path.as_os_str().is_empty() {
            return Err(StoreError::Config("store path is empty".to_string()));
        }
        if self.map_size_gb == 0 {
            return Err(StoreError::Config("map size must be at least 1 GiB".to_string()));
        }
        if self.max_readers == 0 {
            return Err(StoreError::Config("max readers must be positive".to_string()));
        }
        if self.batch_size == 0 {
            return Err(StoreError::Config("batch size must be positive".to_string()));
        }
        Ok(())
    }
}
