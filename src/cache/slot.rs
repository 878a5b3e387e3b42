//! Per-cache-name state guarded inside one process.

use super::{EntryCache, LockFile};

/// One named import cache together with its snapshot generation.
///
/// The pagination controller keeps a slot per export kind behind an async mutex
/// so that requests in this process decide and act on the cache one at a time.
/// The generation is bumped every time a new snapshot is committed and is
/// recorded in the lock tag, which makes it possible to tell from the marker
/// which snapshot a crawl started against.
#[derive(Debug)]
pub struct CacheSlot<R> {
    cache: EntryCache<R>,
    generation: u64,
}

impl<R> CacheSlot<R> {
    pub fn new(cache: EntryCache<R>) -> Self {
        Self {
            cache,
            generation: 0,
        }
    }

    pub fn cache(&self) -> &EntryCache<R> {
        &self.cache
    }

    pub fn lock(&self) -> &LockFile {
        self.cache.lock()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Move to the next snapshot generation and return it.
    pub fn advance_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }
}
