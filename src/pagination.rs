//! Paginated list imports backed by the file cache.
//!
//! Identity providers import by requesting `startIndex=1`, then `startIndex=1+count`
//! and so on until `totalResults` is reached. Each request is independent, so the
//! [`PaginationController`] reconstructs the state of the export from disk on
//! every call:
//!
//! ```text
//! NO_EXPORT --first page, more pages follow--> EXPORT_ACTIVE   snapshot + lock created
//! EXPORT_ACTIVE --another first page--> EXPORT_ACTIVE           "start" appended
//! EXPORT_ACTIVE --last page--> EXPORT_ACTIVE | NO_EXPORT         "end" appended, lock
//!                                                               removed once balanced
//! EXPORT_ACTIVE --lock untouched past its lifetime--> NO_EXPORT
//! ```
//!
//! Requests for one export kind are serialized within the process by an async
//! mutex around the kind's [`CacheSlot`]; across processes the lock marker is the
//! only coordination. Pages of one crawl must be requested in increasing
//! `startIndex` order.

use crate::cache::{CacheError, CacheSlot, EntryCache, LockToken};
use crate::config::ConnectorConfig;
use crate::error::ScimResult;
use crate::filter::Filter;
use crate::resource::Record;
use crate::storage::ResourceStore;
use log::{debug, info, warn};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Which named cache a list request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// No filter: a crawl of every record
    Full,
    /// Filtered on `meta.lastModified`
    Incremental,
    /// Any other filter; always answered from the datastore
    Other,
}

impl ImportKind {
    pub fn from_filter(filter: Option<&Filter>) -> Self {
        match filter {
            None => Self::Full,
            Some(filter) if filter.is_last_modified() => Self::Incremental,
            Some(_) => Self::Other,
        }
    }
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Full => "full",
            Self::Incremental => "incremental",
            Self::Other => "other",
        };
        f.write_str(kind)
    }
}

/// Parameters of one list request.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    start_index: usize,
    count: Option<usize>,
    total_results: Option<usize>,
    filter: Option<Filter>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            start_index: 1,
            count: None,
            total_results: None,
            filter: None,
        }
    }
}

impl PageRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// 1-based index of the first record; values below 1 are raised to 1.
    pub fn with_start_index(mut self, start_index: usize) -> Self {
        self.start_index = start_index.max(1);
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Total reported by the client from an earlier page of the same crawl.
    pub fn with_total_results(mut self, total_results: usize) -> Self {
        self.total_results = Some(total_results);
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn start_index(&self) -> usize {
        self.start_index
    }

    pub fn count(&self) -> Option<usize> {
        self.count
    }

    pub fn total_results(&self) -> Option<usize> {
        self.total_results
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    pub fn is_first_page(&self) -> bool {
        self.start_index == 1
    }

    pub fn import_kind(&self) -> ImportKind {
        ImportKind::from_filter(self.filter.as_ref())
    }
}

/// The `(startIndex, count, totalResults)` triple of one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub start_index: usize,
    pub count: usize,
    pub total_results: usize,
}

impl PageWindow {
    /// Clamp a requested window to the page size limit and the result set.
    ///
    /// `count` defaults to `max_page_size` and never exceeds it. The window never
    /// runs past the end: `start_index + count <= total_results + 1` whenever
    /// `start_index <= total_results + 1`.
    pub fn compute(
        start_index: usize,
        count: Option<usize>,
        total_results: usize,
        max_page_size: usize,
    ) -> Self {
        let start_index = start_index.max(1);
        let remaining = total_results.saturating_add(1).saturating_sub(start_index);
        let count = count
            .unwrap_or(max_page_size)
            .min(max_page_size)
            .min(total_results)
            .min(remaining);
        Self {
            start_index,
            count,
            total_results,
        }
    }

    /// More records follow this page.
    pub fn has_more(&self) -> bool {
        self.start_index.saturating_add(self.count) < self.total_results.saturating_add(1)
    }

    /// This page ends exactly at the last record.
    pub fn is_last(&self) -> bool {
        self.start_index.saturating_add(self.count) == self.total_results.saturating_add(1)
    }

    /// The records this window selects, `records[start_index-1 .. start_index-1+count]`.
    pub fn slice<R: Clone>(&self, records: &[R]) -> Vec<R> {
        records
            .iter()
            .skip(self.start_index - 1)
            .take(self.count)
            .cloned()
            .collect()
    }
}

/// Where the records of a page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSource {
    Datastore,
    Cache,
}

/// One page of a list import.
#[derive(Debug, Clone)]
pub struct Page<R> {
    pub window: PageWindow,
    pub resources: Vec<R>,
    pub source: RecordSource,
}

/// Serves list requests from the datastore or the import cache.
pub struct PaginationController<S: ResourceStore> {
    store: Arc<S>,
    full: Mutex<CacheSlot<S::Record>>,
    incremental: Mutex<CacheSlot<S::Record>>,
    max_page_size: usize,
}

impl<S: ResourceStore> PaginationController<S> {
    /// Open the full and incremental caches for the store's resource type.
    ///
    /// Leftover snapshots and lock markers from a previous run are removed.
    pub async fn open(store: Arc<S>, config: &ConnectorConfig) -> Result<Self, CacheError> {
        let full = EntryCache::open(S::Record::FULL_IMPORT_CACHE, &config.cache).await?;
        let incremental =
            EntryCache::open(S::Record::INCREMENTAL_IMPORT_CACHE, &config.cache).await?;

        Ok(Self {
            store,
            full: Mutex::new(CacheSlot::new(full)),
            incremental: Mutex::new(CacheSlot::new(incremental)),
            max_page_size: config.max_page_size,
        })
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn max_page_size(&self) -> usize {
        self.max_page_size
    }

    /// Serve one page of a list import.
    pub async fn paginate(&self, request: &PageRequest) -> ScimResult<Page<S::Record>> {
        let kind = request.import_kind();
        let guarded = match kind {
            ImportKind::Full => &self.full,
            ImportKind::Incremental => &self.incremental,
            ImportKind::Other => {
                let records = self.fetch(request.filter()).await?;
                let window = self.window(request, records.len());
                debug!(
                    "Filtered {} list served from datastore: {:?}",
                    S::Record::RESOURCE_TYPE,
                    window
                );
                return Ok(Page {
                    resources: window.slice(&records),
                    window,
                    source: RecordSource::Datastore,
                });
            }
        };

        let mut slot = guarded.lock().await;
        let first_page = request.is_first_page();
        let lock_active = slot.lock().is_active().await?;

        let (records, source) = if first_page && !lock_active {
            (self.fetch(request.filter()).await?, RecordSource::Datastore)
        } else {
            match slot.cache().read().await {
                Ok(records) => (records, RecordSource::Cache),
                Err(e) if e.is_recoverable() => {
                    info!("{}, querying the datastore", e);
                    let records = self.fetch(request.filter()).await?;
                    slot.cache().write(&records).await?;
                    (records, RecordSource::Datastore)
                }
                Err(e) => return Err(e.into()),
            }
        };

        let mut joined = false;
        if first_page && lock_active {
            let tag = self.lock_tag(kind, slot.generation());
            joined = slot.lock().append(LockToken::Start, Some(&tag)).await?;
            if joined {
                info!("Joined active {} {} import", kind, S::Record::RESOURCE_TYPE);
            }
        }

        let window = self.window(request, records.len());

        if first_page && !lock_active && window.has_more() {
            let generation = slot.advance_generation();
            let tag = self.lock_tag(kind, generation);
            slot.cache().replace(&records).await?;
            match slot.lock().create(Some(&tag)).await {
                Ok(()) => {}
                Err(CacheError::LockExists { path }) => {
                    warn!(
                        "Another process locked {} first, joining its import",
                        path.display()
                    );
                    joined = slot.lock().append(LockToken::Start, Some(&tag)).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        if window.is_last() && (!first_page || joined) {
            let tag = self.lock_tag(kind, slot.generation());
            slot.lock().append(LockToken::End, Some(&tag)).await?;
            if slot.lock().cleanup(false).await? {
                slot.cache().remove().await?;
                info!(
                    "{} {} import complete, cache released",
                    kind,
                    S::Record::RESOURCE_TYPE
                );
            }
        }

        debug!(
            "Serving {} {} page {:?} from {:?}",
            kind,
            S::Record::RESOURCE_TYPE,
            window,
            source
        );

        Ok(Page {
            resources: window.slice(&records),
            window,
            source,
        })
    }

    /// Force-clear both caches and their lock markers.
    pub async fn clear_caches(&self) -> ScimResult<()> {
        for guarded in [&self.full, &self.incremental] {
            let slot = guarded.lock().await;
            slot.cache().force_clear().await?;
        }
        Ok(())
    }

    async fn fetch(&self, filter: Option<&Filter>) -> ScimResult<Vec<S::Record>> {
        self.store.list(filter).await.map_err(Into::into)
    }

    fn window(&self, request: &PageRequest, available: usize) -> PageWindow {
        PageWindow::compute(
            request.start_index(),
            request.count(),
            request.total_results().unwrap_or(available),
            self.max_page_size,
        )
    }

    fn lock_tag(&self, kind: ImportKind, generation: u64) -> String {
        format!(
            "{}:{}:{} (pid {})",
            S::Record::RESOURCE_TYPE,
            kind,
            generation,
            std::process::id()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ScimUser;
    use crate::storage::{InMemoryStore, StoreError};
    use std::path::PathBuf;

    /// Store whose list query lets another process take the lock in the meantime.
    struct RacingStore {
        inner: InMemoryStore<ScimUser>,
        marker: PathBuf,
    }

    impl ResourceStore for RacingStore {
        type Record = ScimUser;
        type Error = StoreError;

        async fn get(&self, id: &str) -> Result<Option<ScimUser>, StoreError> {
            self.inner.get(id).await
        }

        async fn list(&self, filter: Option<&Filter>) -> Result<Vec<ScimUser>, StoreError> {
            let records = self.inner.list(filter).await?;
            tokio::fs::write(&self.marker, "start\tUser:full:1 (pid 1)\n")
                .await
                .unwrap();
            Ok(records)
        }

        async fn create(&self, record: ScimUser) -> Result<ScimUser, StoreError> {
            self.inner.create(record).await
        }

        async fn update(&self, id: &str, record: ScimUser) -> Result<Option<ScimUser>, StoreError> {
            self.inner.update(id, record).await
        }

        async fn delete(&self, id: &str) -> Result<bool, StoreError> {
            self.inner.delete(id).await
        }
    }

    #[tokio::test]
    async fn test_first_page_joins_lock_taken_during_query() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConnectorConfig::default().with_cache_dir(dir.path());
        let marker = dir.path().join("full_import_cache.json.lock");
        let store = RacingStore {
            inner: InMemoryStore::from_records(
                (1..=3).map(|n| ScimUser::new(format!("user{n}@example.com")).with_id(format!("u{n}"))),
            ),
            marker: marker.clone(),
        };
        let controller = PaginationController::open(Arc::new(store), &config).await.unwrap();

        let page = controller
            .paginate(&PageRequest::new().with_start_index(1).with_count(1))
            .await
            .unwrap();
        assert_eq!(page.resources.len(), 1);
        assert_eq!(page.source, RecordSource::Datastore);

        let content = std::fs::read_to_string(&marker).unwrap();
        let tokens: Vec<&str> = content
            .lines()
            .map(|line| line.split('\t').next().unwrap_or_default())
            .collect();
        assert_eq!(tokens, vec!["start", "start"]);
        assert!(content.starts_with("start\tUser:full:1 (pid 1)\n"));
        assert!(dir.path().join("full_import_cache.json").exists());
    }

    #[test]
    fn test_window_defaults_to_max_page_size() {
        let window = PageWindow::compute(1, None, 500, 200);
        assert_eq!(window.count, 200);
        assert!(window.has_more());
        assert!(!window.is_last());
    }

    #[test]
    fn test_window_clamps_to_total() {
        let window = PageWindow::compute(1, Some(50), 22, 200);
        assert_eq!(window.count, 22);
        assert!(window.is_last());
    }

    #[test]
    fn test_window_clamps_overrun() {
        let window = PageWindow::compute(20, Some(5), 22, 200);
        assert_eq!(window.count, 3);
        assert!(window.is_last());

        let window = PageWindow::compute(30, Some(5), 22, 200);
        assert_eq!(window.count, 0);
        assert!(!window.is_last());
    }

    #[test]
    fn test_window_of_empty_result_set() {
        let window = PageWindow::compute(1, Some(10), 0, 200);
        assert_eq!(window.count, 0);
        assert!(window.is_last());
        assert!(!window.has_more());
    }

    #[test]
    fn test_window_near_usize_max() {
        let window = PageWindow::compute(usize::MAX, Some(10), usize::MAX, 200);
        assert_eq!(window.count, 0);
        assert!(!window.has_more());

        let window = PageWindow::compute(usize::MAX - 5, None, usize::MAX - 1, 200);
        assert_eq!(window.count, 5);
        assert!(window.is_last());
        assert!(!window.has_more());
        assert!(window.slice(&[1u8, 2, 3]).is_empty());
    }

    #[test]
    fn test_slice_uses_one_based_index() {
        let records: Vec<u32> = (1..=10).collect();
        let window = PageWindow::compute(4, Some(3), 10, 200);
        assert_eq!(window.slice(&records), vec![4, 5, 6]);
    }

    #[test]
    fn test_slice_tolerates_stale_total() {
        let records: Vec<u32> = (1..=5).collect();
        let window = PageWindow::compute(4, Some(3), 10, 200);
        assert_eq!(window.slice(&records), vec![4, 5]);
    }

    #[test]
    fn test_import_kind_from_filter() {
        assert_eq!(ImportKind::from_filter(None), ImportKind::Full);

        let incremental = Filter::parse(r#"meta.lastModified gt "2021-05-07T14:19:34Z""#).unwrap();
        assert_eq!(ImportKind::from_filter(Some(&incremental)), ImportKind::Incremental);

        let other = Filter::parse(r#"userName eq "ada""#).unwrap();
        assert_eq!(ImportKind::from_filter(Some(&other)), ImportKind::Other);
    }

    #[test]
    fn test_request_normalises_start_index() {
        let request = PageRequest::new().with_start_index(0).with_count(5);
        assert_eq!(request.start_index(), 1);
        assert!(request.is_first_page());
        assert_eq!(request.import_kind(), ImportKind::Full);
    }
}
