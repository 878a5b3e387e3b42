//! File-backed import cache with cooperative locking.
//!
//! Identity providers import users and groups by crawling a list endpoint page
//! by page, and every page arrives as an independent request. This module keeps
//! such a crawl consistent without any shared memory between requests: the full
//! result set of the first page is written to a JSON snapshot on disk, and a
//! companion lock marker records which crawls are still reading from it.
//!
//! # On-disk layout
//!
//! For a cache named `full_import_cache.json` under the configured directory:
//!
//! ```text
//! <cache dir>/full_import_cache.json        JSON array of records
//! <cache dir>/full_import_cache.json.lock   one token per line: "start" or "end",
//!                                           optionally followed by a TAB and a tag
//! ```
//!
//! The snapshot's age is taken from its modification time. The marker's age is
//! taken from its modification time too, so every appended token extends the
//! lifetime of the lock.
//!
//! # Components
//!
//! - [`LockFile`] - advisory lock marker with start/end token accounting
//! - [`EntryCache`] - snapshot storage with a fixed time-to-live
//! - [`CacheSlot`] - pairs an entry cache with a snapshot generation counter
//!
//! Nothing here keeps state between calls: each check re-reads the filesystem,
//! which is what makes the scheme safe across processes.

pub mod entry;
pub mod lock;
pub mod slot;

pub use entry::EntryCache;
pub use lock::{LockFile, LockToken, TokenCounts};
pub use slot::CacheSlot;

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Errors raised by the import cache and its lock marker.
///
/// [`CacheError::Expired`] and [`CacheError::Missing`] are signals rather than
/// failures: they tell the caller to go back to the datastore. Everything else
/// is a genuine I/O or data problem.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The snapshot outlived its lifetime and no active lock protects it
    #[error("Cache '{name}' has timed out")]
    Expired { name: String },

    /// No snapshot has been written yet
    #[error("Cache '{name}' does not exist")]
    Missing { name: String },

    /// A lock marker is already present at the path
    #[error("Lock marker already exists at {}", path.display())]
    LockExists { path: PathBuf },

    /// Filesystem failure
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The snapshot could not be encoded or decoded
    #[error("Cache file {} holds invalid JSON: {source}", path.display())]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CacheError {
    /// Whether the condition should be resolved by querying the datastore.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Expired { .. } | Self::Missing { .. })
    }

    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Path of the lock marker that accompanies a cache file.
pub fn lock_path_for(cache_path: &Path) -> PathBuf {
    let mut name = cache_path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Modification time of `path`, or `None` if it does not exist.
pub(crate) async fn modified_time(path: &Path) -> Result<Option<SystemTime>, CacheError> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata
            .modified()
            .map(Some)
            .map_err(|e| CacheError::io(path, e)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CacheError::io(path, e)),
    }
}

/// Time elapsed since `instant`; clock skew into the future counts as zero.
pub(crate) fn age(instant: SystemTime) -> Duration {
    SystemTime::now()
        .duration_since(instant)
        .unwrap_or(Duration::ZERO)
}

/// Remove a file, returning `false` if it was already gone.
pub(crate) async fn remove_if_exists(path: &Path) -> Result<bool, CacheError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CacheError::io(path, e)),
    }
}
