// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::io;
use std::path::{Path, PathBuf};

/// Why a cache file was rejected as structurally invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Corruption {
    #[error("only some of the cache files are present")]
    Incomplete,

    #[error("file is empty")]
    Empty,

    #[error("file is truncated")]
    Truncated,

    #[error("unexpected magic bytes")]
    BadMagic,

    #[error("checksum mismatch")]
    Checksum,

    #[error("undecodable payload: {0}")]
    Decode(String),

    #[error("inconsistent contents: {0}")]
    Inconsistent(String),
}

/// Error conditions which may occur when loading, saving or purging the cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// No cache files exist. Recoverable by building the network from source.
    #[error("cache is missing")]
    Missing,

    /// Cache files exist, but can't be used. Recoverable by purging and rebuilding.
    #[error("cache file {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: Corruption },

    /// Cache files were written by an incompatible version of the format.
    /// Recoverable by purging and rebuilding.
    #[error("cache file {path} has format version {found}, expected {expected}")]
    Version {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    /// Unexpected I/O failure. Not recoverable - the cache is left untouched.
    #[error("cache io on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Deleting cache files kept failing. Building on top of a half-deleted cache
    /// is unsafe, so this must abort initialization.
    #[error("failed to delete {path} after {attempts} attempts: {source}")]
    PurgeFailed {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: io::Error,
    },
}

impl CacheError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn corrupt(path: &Path, reason: Corruption) -> Self {
        Self::Corrupt {
            path: path.to_path_buf(),
            reason,
        }
    }

    /// Returns true for caches which exist but can't be used,
    /// and therefore need to be purged before rebuilding.
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Corrupt { .. } | Self::Version { .. })
    }

    /// Returns true if the network needs to be built from source.
    pub fn requires_rebuild(&self) -> bool {
        matches!(self, Self::Missing) || self.is_invalid()
    }
}
