//! SCIM 2.0 provisioning connector for Rust.
//!
//! Serves users and groups to an identity provider over SCIM, with a
//! file-backed import cache that keeps multi-page list exports consistent and
//! runs the datastore query only once per export.
//!
//! # Core Components
//!
//! - [`ScimEndpoints`] - Every connector endpoint, independent of the HTTP framework
//! - [`PaginationController`] - Serves list pages from the datastore or the import cache
//! - [`ResourceStore`] - Trait for implementing datastores
//! - [`ConnectorConfig`] - Cache, server, authentication and feature settings
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use scim_connector::{ConnectorConfig, InMemoryStore, ListQuery, ScimEndpoints};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(ConnectorConfig::default().with_cache_dir("/tmp/scim-cache"));
//! let users = Arc::new(InMemoryStore::new());
//! let groups = Arc::new(InMemoryStore::new());
//! let endpoints = ScimEndpoints::open(config, users, groups).await?;
//!
//! let page = endpoints
//!     .list_users(&ListQuery::new().with_start_index(1).with_count(100))
//!     .await;
//! assert_eq!(page.status, 200);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod filter;
pub mod operation_handler;
pub mod pagination;
pub mod resource;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use auth::{AuthScheme, AuthSettings};
pub use cache::{CacheError, EntryCache, LockFile, LockToken};
pub use config::{ConfigError, ConnectorConfig, ProvisioningFeature};
pub use error::{ScimError, ScimResult};
pub use filter::{Filter, FilterOperator, FilterValue, Filterable};
pub use operation_handler::{ListQuery, ScimEndpoints, ScimOperation, ScimResponse};
pub use pagination::{ImportKind, Page, PageRequest, PageWindow, PaginationController};
pub use resource::{ListResponse, Record, ScimGroup, ScimUser};
pub use storage::{InMemoryStore, ResourceStore, SeedData, StoreError};
