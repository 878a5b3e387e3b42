//! In-memory datastore.
//!
//! Records are kept in a `BTreeMap` keyed by id behind an async `RwLock`, which
//! gives `list` the stable ordering the pagination layer depends on. The store
//! can be switched offline to exercise datastore failures, and counts list
//! queries so tests can verify that an export hits the datastore only once.

use super::{ResourceStore, StoreError};
use crate::filter::Filter;
use crate::resource::{Record, version};
use chrono::Utc;
use log::debug;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Thread-safe in-memory store for one resource type.
///
/// Cloning is cheap and clones share the same data.
#[derive(Debug)]
pub struct InMemoryStore<R> {
    records: Arc<RwLock<BTreeMap<String, R>>>,
    available: Arc<AtomicBool>,
    list_queries: Arc<AtomicUsize>,
}

impl<R> Clone for InMemoryStore<R> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
            available: Arc::clone(&self.available),
            list_queries: Arc::clone(&self.list_queries),
        }
    }
}

/// Counters exposed for monitoring and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InMemoryStoreStats {
    pub records: usize,
    pub list_queries: usize,
}

impl<R: Record> InMemoryStore<R> {
    pub fn new() -> Self {
        Self::from_records(Vec::new())
    }

    /// Build a store holding `records` exactly as given.
    ///
    /// Metadata is left untouched so fixtures keep their timestamps; records
    /// without an id are assigned one.
    pub fn from_records(records: impl IntoIterator<Item = R>) -> Self {
        let map = records
            .into_iter()
            .map(|mut record| {
                let id = match record.id() {
                    Some(id) => id.to_string(),
                    None => {
                        let id = uuid::Uuid::new_v4().to_string();
                        record.set_id(id.clone());
                        id
                    }
                };
                (id, record)
            })
            .collect();

        Self {
            records: Arc::new(RwLock::new(map)),
            available: Arc::new(AtomicBool::new(true)),
            list_queries: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Simulate the backend going offline (or coming back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub async fn stats(&self) -> InMemoryStoreStats {
        InMemoryStoreStats {
            records: self.records.read().await.len(),
            list_queries: self.list_queries.load(Ordering::SeqCst),
        }
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::unavailable(format!(
                "{} store is offline",
                R::RESOURCE_TYPE
            )))
        }
    }
}

impl<R: Record> Default for InMemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> ResourceStore for InMemoryStore<R> {
    type Record = R;
    type Error = StoreError;

    async fn get(&self, id: &str) -> Result<Option<R>, Self::Error> {
        self.ensure_available()?;
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn list(&self, filter: Option<&Filter>) -> Result<Vec<R>, Self::Error> {
        self.ensure_available()?;
        self.list_queries.fetch_add(1, Ordering::SeqCst);

        let records = self.records.read().await;
        let matching: Vec<R> = records
            .values()
            .filter(|record| filter.is_none_or(|f| f.matches(*record)))
            .cloned()
            .collect();

        debug!(
            "Listed {} of {} {} records (filter: {})",
            matching.len(),
            records.len(),
            R::RESOURCE_TYPE,
            filter.map(Filter::expression).unwrap_or("none")
        );
        Ok(matching)
    }

    async fn create(&self, mut record: R) -> Result<R, Self::Error> {
        self.ensure_available()?;
        let mut records = self.records.write().await;

        let id = match record.id() {
            Some(id) if records.contains_key(id) => {
                return Err(StoreError::AlreadyExists {
                    resource_type: R::RESOURCE_TYPE.to_string(),
                    id: id.to_string(),
                });
            }
            Some(id) => id.to_string(),
            None => uuid::Uuid::new_v4().to_string(),
        };

        record.set_id(id.clone());
        record.meta_mut().created = None;
        version::stamp(&mut record, Utc::now())?;
        records.insert(id, record.clone());
        Ok(record)
    }

    async fn update(&self, id: &str, mut record: R) -> Result<Option<R>, Self::Error> {
        self.ensure_available()?;
        let mut records = self.records.write().await;

        let Some(existing) = records.get(id) else {
            return Ok(None);
        };

        record.set_id(id.to_string());
        record.meta_mut().created = existing.meta().created;
        version::stamp(&mut record, Utc::now())?;
        records.insert(id.to_string(), record.clone());
        Ok(Some(record))
    }

    async fn delete(&self, id: &str) -> Result<bool, Self::Error> {
        self.ensure_available()?;
        Ok(self.records.write().await.remove(id).is_some())
    }
}
