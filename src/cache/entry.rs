//! Snapshot storage for one import crawl.
//!
//! An [`EntryCache`] owns a single JSON file holding the full, ordered result set
//! of an export together with the [`LockFile`] that protects it. The snapshot has
//! a fixed lifetime measured from when it was written; a crawl that is still in
//! progress keeps reading it past that lifetime because consistency for the
//! duration of one export matters more than freshness.

use super::{CacheError, LockFile, age, lock_path_for, modified_time, remove_if_exists};
use crate::config::CacheSettings;
use log::{debug, info};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Durable snapshot of one export's records.
#[derive(Debug)]
pub struct EntryCache<R> {
    name: String,
    path: PathBuf,
    lifetime: Duration,
    lock: LockFile,
    _record: PhantomData<fn() -> R>,
}

impl<R> EntryCache<R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock(&self) -> &LockFile {
        &self.lock
    }
}

impl<R> EntryCache<R>
where
    R: Serialize + DeserializeOwned,
{
    /// Open the cache named `name` under the configured directory.
    ///
    /// Any snapshot or lock marker left behind by a previous process is deleted:
    /// a restart never trusts leftover state.
    pub async fn open(name: impl Into<String>, settings: &CacheSettings) -> Result<Self, CacheError> {
        tokio::fs::create_dir_all(&settings.dir)
            .await
            .map_err(|e| CacheError::io(&settings.dir, e))?;

        let name = name.into();
        let path = settings.dir.join(&name);
        let lock = LockFile::new(lock_path_for(&path), settings.lock_lifetime());
        let cache = Self {
            name,
            path,
            lifetime: settings.entry_lifetime(),
            lock,
            _record: PhantomData,
        };

        if cache.force_clear().await? {
            debug!("Deleted leftover cache '{}' from a previous run", cache.name);
        }
        Ok(cache)
    }

    pub async fn exists(&self) -> Result<bool, CacheError> {
        Ok(modified_time(&self.path).await?.is_some())
    }

    /// The snapshot exists and is younger than its lifetime.
    pub async fn is_valid(&self) -> Result<bool, CacheError> {
        match modified_time(&self.path).await? {
            Some(created) => Ok(age(created) < self.lifetime),
            None => Ok(false),
        }
    }

    /// Store `records` unless an existing snapshot must be preserved.
    ///
    /// A valid snapshot is kept, and so is an expired one while a lock is
    /// active: an in-progress crawl must never see its data change mid-stream.
    /// Returns whether the file was written.
    pub async fn write(&self, records: &[R]) -> Result<bool, CacheError> {
        if self.exists().await? {
            if self.is_valid().await? {
                debug!("Cache '{}' still valid, keeping it", self.name);
                return Ok(false);
            }
            if self.lock.is_active().await? {
                debug!(
                    "Cache '{}' expired but an import still holds the lock, keeping it",
                    self.name
                );
                return Ok(false);
            }
            info!("Cache '{}' no longer valid, replacing it", self.name);
            remove_if_exists(&self.path).await?;
        } else {
            debug!("No cache found for '{}', writing data to cache", self.name);
        }

        self.store(records).await?;
        Ok(true)
    }

    /// Unconditionally replace the snapshot with `records`.
    ///
    /// Only for committing the snapshot of a new crawl, after the caller has
    /// established that no lock is active.
    pub async fn replace(&self, records: &[R]) -> Result<(), CacheError> {
        if remove_if_exists(&self.path).await? {
            debug!("Discarded previous snapshot of '{}'", self.name);
        }
        self.store(records).await
    }

    /// Load the snapshot.
    ///
    /// An expired snapshot is still returned while a lock is active. Without a
    /// lock it yields [`CacheError::Expired`], and a missing file yields
    /// [`CacheError::Missing`]; both mean the caller should query the datastore.
    pub async fn read(&self) -> Result<Vec<R>, CacheError> {
        if !self.exists().await? {
            return Err(CacheError::Missing {
                name: self.name.clone(),
            });
        }

        if !self.is_valid().await? {
            if !self.lock.is_active().await? {
                debug!("Cache '{}' has timed out", self.name);
                return Err(CacheError::Expired {
                    name: self.name.clone(),
                });
            }
            debug!(
                "Cache '{}' expired but is locked by an import, serving stale snapshot",
                self.name
            );
        }

        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CacheError::Missing {
                    name: self.name.clone(),
                });
            }
            Err(e) => return Err(CacheError::io(&self.path, e)),
        };

        debug!("Reading data from cache '{}'", self.name);
        serde_json::from_slice(&bytes).map_err(|source| CacheError::Serialization {
            path: self.path.clone(),
            source,
        })
    }

    /// Delete the snapshot file, leaving the lock marker alone.
    pub async fn remove(&self) -> Result<bool, CacheError> {
        remove_if_exists(&self.path).await
    }

    /// Delete both the snapshot and its lock marker.
    pub async fn force_clear(&self) -> Result<bool, CacheError> {
        let entry_removed = remove_if_exists(&self.path).await?;
        let lock_removed = self.lock.cleanup(true).await?;
        if entry_removed || lock_removed {
            info!("Cleared cache '{}'", self.name);
        }
        Ok(entry_removed || lock_removed)
    }

    async fn store(&self, records: &[R]) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(records).map_err(|source| CacheError::Serialization {
            path: self.path.clone(),
            source,
        })?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| CacheError::io(&self.path, e))?;
        debug!("Wrote {} records to cache '{}'", records.len(), self.name);
        Ok(())
    }
}
