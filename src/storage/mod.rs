//! Downstream identity store abstraction.
//!
//! The connector never talks to a concrete database directly. Everything it needs
//! from the system of record is expressed by [`ResourceStore`]: keyed lookups,
//! filtered listing in a stable order, and whole-record create, update and
//! delete. List queries may be slow; the import cache exists so that a
//! multi-page export runs [`ResourceStore::list`] once rather than once per page.
//!
//! [`InMemoryStore`] is the bundled implementation, used by the server binary
//! (optionally seeded from a JSON file, see [`SeedData`]) and by the tests.

pub mod errors;
pub mod in_memory;
pub mod seed;

pub use errors::StoreError;
pub use in_memory::{InMemoryStore, InMemoryStoreStats};
pub use seed::SeedData;

use crate::error::ScimError;
use crate::filter::Filter;
use crate::resource::Record;
use std::future::Future;

/// Storage backend for one resource type.
///
/// # Design Principles
///
/// - **Whole records**: create and update take and return complete resources
/// - **Stable order**: `list` must return records in the same order on every call,
///   so that page windows computed against one result set line up
/// - **Absence is not an error**: `get` and `update` return `None` and `delete`
///   returns `false` for unknown ids, leaving the 404 decision to the caller
/// - **Errors convert**: backend errors convert into [`ScimError`], so that
///   conflicts can surface as 409 and everything else as a server failure
pub trait ResourceStore: Send + Sync + 'static {
    /// Resource type served by this store.
    type Record: Record;

    /// The error type returned by storage operations.
    type Error: std::error::Error + Send + Sync + 'static + Into<ScimError>;

    /// Fetch a record by id.
    fn get(&self, id: &str) -> impl Future<Output = Result<Option<Self::Record>, Self::Error>> + Send;

    /// All records matching `filter` (or all records when `None`), in a stable order.
    fn list(
        &self,
        filter: Option<&Filter>,
    ) -> impl Future<Output = Result<Vec<Self::Record>, Self::Error>> + Send;

    /// Store a new record and return it as stored, with its id assigned.
    fn create(
        &self,
        record: Self::Record,
    ) -> impl Future<Output = Result<Self::Record, Self::Error>> + Send;

    /// Replace the record with `id`. Returns `None` when no such record exists.
    fn update(
        &self,
        id: &str,
        record: Self::Record,
    ) -> impl Future<Output = Result<Option<Self::Record>, Self::Error>> + Send;

    /// Remove the record with `id`. Returns whether it existed.
    fn delete(&self, id: &str) -> impl Future<Output = Result<bool, Self::Error>> + Send;
}
