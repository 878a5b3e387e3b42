//! Advisory lock marker for multi-page import crawls.
//!
//! The marker is a plain text file holding one token per line. A crawl that
//! starts against the snapshot writes `start`, a crawl that reaches its last page
//! writes `end`, and the marker may only be removed once both counts agree.

use super::{CacheError, age, modified_time, remove_if_exists};
use log::{debug, info, warn};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Token recorded in a lock marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockToken {
    Start,
    End,
}

impl LockToken {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockToken::Start => "start",
            LockToken::End => "end",
        }
    }

    fn parse(line: &str) -> Option<Self> {
        match line.split('\t').next().map(str::trim) {
            Some("start") => Some(LockToken::Start),
            Some("end") => Some(LockToken::End),
            _ => None,
        }
    }

    fn line(&self, tag: Option<&str>) -> String {
        match tag {
            Some(tag) => format!("{}\t{}\n", self.as_str(), tag),
            None => format!("{}\n", self.as_str()),
        }
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of start and end tokens found in a marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenCounts {
    pub starts: usize,
    pub ends: usize,
}

impl TokenCounts {
    /// Every crawl that started has also finished.
    pub fn is_balanced(&self) -> bool {
        self.starts == self.ends
    }
}

/// File-backed lock marker.
///
/// Holds no state besides its path and lifetime; every method goes back to the
/// filesystem.
#[derive(Debug, Clone)]
pub struct LockFile {
    path: PathBuf,
    lifetime: Duration,
}

impl LockFile {
    pub fn new(path: impl Into<PathBuf>, lifetime: Duration) -> Self {
        Self {
            path: path.into(),
            lifetime,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Whether the marker is present on disk.
    pub async fn exists(&self) -> Result<bool, CacheError> {
        Ok(modified_time(&self.path).await?.is_some())
    }

    /// Whether a crawl currently holds the lock.
    ///
    /// A marker older than the configured lifetime belongs to a crawl that died
    /// without reaching its last page; it is removed and reported inactive.
    pub async fn is_active(&self) -> Result<bool, CacheError> {
        let Some(modified) = modified_time(&self.path).await? else {
            return Ok(false);
        };

        let elapsed = age(modified);
        if elapsed > self.lifetime {
            warn!(
                "Lock marker {} untouched for {:?} (lifetime {:?}), treating it as abandoned",
                self.path.display(),
                elapsed,
                self.lifetime
            );
            self.cleanup(true).await?;
            return Ok(false);
        }

        Ok(true)
    }

    /// Write a new marker holding a single `start` token.
    ///
    /// Fails with [`CacheError::LockExists`] when a marker is already present;
    /// callers are expected to check [`is_active`](Self::is_active) first.
    pub async fn create(&self, tag: Option<&str>) -> Result<(), CacheError> {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => CacheError::LockExists {
                    path: self.path.clone(),
                },
                _ => CacheError::io(&self.path, e),
            })?;

        file.write_all(LockToken::Start.line(tag).as_bytes())
            .await
            .map_err(|e| CacheError::io(&self.path, e))?;
        file.flush()
            .await
            .map_err(|e| CacheError::io(&self.path, e))?;

        info!(
            "Created lock marker {} ({})",
            self.path.display(),
            tag.unwrap_or("untagged")
        );
        Ok(())
    }

    /// Append a token to an existing marker.
    ///
    /// Returns `false` without touching the filesystem when the marker is gone;
    /// a marker removed by a concurrent cleanup is never recreated here.
    pub async fn append(&self, token: LockToken, tag: Option<&str>) -> Result<bool, CacheError> {
        let mut file = match tokio::fs::OpenOptions::new()
            .append(true)
            .open(&self.path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(
                    "Lock marker {} disappeared before '{}' could be recorded",
                    self.path.display(),
                    token
                );
                return Ok(false);
            }
            Err(e) => return Err(CacheError::io(&self.path, e)),
        };

        file.write_all(token.line(tag).as_bytes())
            .await
            .map_err(|e| CacheError::io(&self.path, e))?;
        file.flush()
            .await
            .map_err(|e| CacheError::io(&self.path, e))?;

        debug!("Appended '{}' to lock marker {}", token, self.path.display());
        Ok(true)
    }

    /// Count the tokens in the marker, or `None` if it does not exist.
    pub async fn token_counts(&self) -> Result<Option<TokenCounts>, CacheError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::io(&self.path, e)),
        };

        let mut counts = TokenCounts::default();
        for line in content.lines().filter(|line| !line.trim().is_empty()) {
            match LockToken::parse(line) {
                Some(LockToken::Start) => counts.starts += 1,
                Some(LockToken::End) => counts.ends += 1,
                None => debug!(
                    "Ignoring unrecognised line '{}' in {}",
                    line,
                    self.path.display()
                ),
            }
        }
        Ok(Some(counts))
    }

    /// Remove the marker.
    ///
    /// With `force` the marker is deleted unconditionally. Otherwise it is only
    /// deleted when balanced. Returns whether a file was removed; a marker that
    /// is already gone was cleaned up by whoever won the race.
    pub async fn cleanup(&self, force: bool) -> Result<bool, CacheError> {
        if force {
            let removed = remove_if_exists(&self.path).await?;
            if removed {
                info!("Force removed lock marker {}", self.path.display());
            }
            return Ok(removed);
        }

        let Some(counts) = self.token_counts().await? else {
            info!(
                "Lock marker {} already cleaned up by another request",
                self.path.display()
            );
            return Ok(false);
        };

        if !counts.is_balanced() {
            info!(
                "Lock marker {} still held ({} started, {} finished), leaving it in place",
                self.path.display(),
                counts.starts,
                counts.ends
            );
            return Ok(false);
        }

        let removed = remove_if_exists(&self.path).await?;
        if removed {
            info!("Removed balanced lock marker {}", self.path.display());
        } else {
            info!(
                "Lock marker {} already cleaned up by another request",
                self.path.display()
            );
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use std::time::SystemTime;

    fn lock_in(dir: &tempfile::TempDir) -> LockFile {
        LockFile::new(dir.path().join("cache.json.lock"), Duration::from_secs(600))
    }

    fn age_file(path: &Path, by: Duration) {
        let past = FileTime::from_system_time(SystemTime::now() - by);
        filetime::set_file_mtime(path, past).unwrap();
    }

    #[tokio::test]
    async fn test_create_writes_tagged_start() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_in(&dir);

        lock.create(Some("User:full:1")).await.unwrap();

        let content = tokio::fs::read_to_string(lock.path()).await.unwrap();
        assert_eq!(content, "start\tUser:full:1\n");
        assert!(lock.exists().await.unwrap());
        assert!(lock.is_active().await.unwrap());
    }

    #[tokio::test]
    async fn test_create_refuses_existing_marker() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_in(&dir);

        lock.create(None).await.unwrap();
        let second = lock.create(None).await;

        assert!(matches!(second, Err(CacheError::LockExists { .. })));
        let counts = lock.token_counts().await.unwrap().unwrap();
        assert_eq!(counts.starts, 1);
    }

    #[tokio::test]
    async fn test_cleanup_waits_for_balance() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_in(&dir);

        lock.create(None).await.unwrap();
        assert!(lock.append(LockToken::Start, None).await.unwrap());
        assert!(lock.append(LockToken::End, None).await.unwrap());

        assert!(!lock.cleanup(false).await.unwrap());
        assert!(lock.exists().await.unwrap());

        assert!(lock.append(LockToken::End, None).await.unwrap());
        let counts = lock.token_counts().await.unwrap().unwrap();
        assert_eq!(counts, TokenCounts { starts: 2, ends: 2 });

        assert!(lock.cleanup(false).await.unwrap());
        assert!(!lock.exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_cleanup_of_missing_marker_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_in(&dir);

        assert!(!lock.cleanup(false).await.unwrap());
        assert!(!lock.cleanup(true).await.unwrap());
    }

    #[tokio::test]
    async fn test_force_cleanup_ignores_balance() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_in(&dir);

        lock.create(None).await.unwrap();
        assert!(lock.cleanup(true).await.unwrap());
        assert!(!lock.exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_append_to_missing_marker_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_in(&dir);

        assert!(!lock.append(LockToken::End, None).await.unwrap());
        assert!(!lock.exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_stale_marker_is_abandoned() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_in(&dir);

        lock.create(None).await.unwrap();
        age_file(lock.path(), Duration::from_secs(3600));

        assert!(lock.exists().await.unwrap());
        assert!(!lock.is_active().await.unwrap());
        assert!(!lock.exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_append_extends_lifetime() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_in(&dir);

        lock.create(None).await.unwrap();
        age_file(lock.path(), Duration::from_secs(3600));
        lock.append(LockToken::Start, None).await.unwrap();

        assert!(lock.is_active().await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_lines_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_in(&dir);

        tokio::fs::write(lock.path(), "start\tUser:full:3\ngarbage\n\nend\n")
            .await
            .unwrap();

        let counts = lock.token_counts().await.unwrap().unwrap();
        assert_eq!(counts, TokenCounts { starts: 1, ends: 1 });
        assert!(counts.is_balanced());
    }
}
