//! LMDB environment factory.
//!
//! Each table family owns one environment under the configured base
//! directory. Environments are opened with a fixed mapped size, a bounded
//! number of reader slots, and room for the family's named databases; the
//! handle is cheaply cloneable and shared across threads.

use std::fs;
use std::path::{Path, PathBuf};

use heed3::{Env, EnvOpenOptions};

use crate::config::{StoreConfig, DEFAULT_MAX_DBS};
use crate::error::StoreResult;

/// Directory of a family's environment under the base path.
pub fn family_dir(base: &Path, family: &str) -> PathBuf {
    base.join(family)
}

/// Open (creating if needed) the environment for one table family.
pub fn open_family_env(base: &Path, family: &str, config: &StoreConfig) -> StoreResult<Env> {
    let path = family_dir(base, family);
    fs::create_dir_all(&path)?;

    let env = unsafe {
        EnvOpenOptions::new()
            .map_size(config.map_size_gb * 1024 * 1024 * 1024)
            .max_dbs(DEFAULT_MAX_DBS)
            .max_readers(config.max_readers)
            .open(&path)?
    };

    Ok(env)
}
