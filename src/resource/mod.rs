//! SCIM resource models served by the connector.
//!
//! Users and groups share the [`Record`] trait, which is everything the
//! datastore, the import cache and the list endpoints need to know about a
//! resource: its identity, its metadata, where it is cached, and how it is
//! matched by a filter.

pub mod group;
pub mod list_response;
pub mod meta;
pub mod user;
pub mod version;

pub use group::{MemberRef, ScimGroup};
pub use list_response::ListResponse;
pub use meta::Meta;
pub use user::{MultiValuedAttribute, Name, ScimUser};
pub use version::ResourceVersion;

use crate::filter::Filterable;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A SCIM resource that can be stored, filtered and cached.
///
/// Cache names are fixed per resource type so that full and incremental imports
/// of users and groups each get their own snapshot and lock marker.
pub trait Record: Serialize + DeserializeOwned + Filterable + Clone + Send + Sync + 'static {
    /// SCIM resource type, e.g. `User`
    const RESOURCE_TYPE: &'static str;

    /// Endpoint path the resource is served under, e.g. `/Users`
    const ENDPOINT: &'static str;

    /// Cache file used by unfiltered list crawls
    const FULL_IMPORT_CACHE: &'static str;

    /// Cache file used by crawls filtered on `meta.lastModified`
    const INCREMENTAL_IMPORT_CACHE: &'static str;

    fn id(&self) -> Option<&str>;

    fn set_id(&mut self, id: String);

    fn meta(&self) -> &Meta;

    fn meta_mut(&mut self) -> &mut Meta;
}
