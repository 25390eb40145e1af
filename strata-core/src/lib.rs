//! Strata Core - Shared Types
//!
//! Errors, configuration and path rules shared by every Strata crate.
//! This crate performs no I/O.

use serde::{Deserialize, Serialize};

pub mod config;
pub mod error;
pub mod path;

pub use config::{CacheConfig, DEFAULT_MAX_SIZE, DEFAULT_TTL, MIN_TTL};
pub use error::{ConfigError, StorageError, StrataError, StrataResult};

/// Default permission bits for newly created files.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Default permission bits for newly created directories.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Metadata returned by a backend `stat` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    /// Content length in bytes (0 for directories).
    pub size: u64,
    /// Whether the path is a directory.
    pub is_dir: bool,
    /// Unix-style permission bits.
    pub mode: u32,
}

impl FileStat {
    /// Stat for a regular file.
    pub fn file(size: u64, mode: u32) -> Self {
        Self {
            size,
            is_dir: false,
            mode,
        }
    }

    /// Stat for a directory.
    pub fn dir(mode: u32) -> Self {
        Self {
            size: 0,
            is_dir: true,
            mode,
        }
    }
}
