//! Framework-agnostic SCIM endpoint handlers.
//!
//! [`ScimEndpoints`] implements every endpoint of the connector against plain
//! inputs (ids, raw query parameters, raw request bodies) and returns a
//! [`ScimResponse`] holding a status code and an optional JSON body. The HTTP
//! layer in [`crate::server`] only extracts those inputs and writes the response
//! back, so the whole request contract can be tested without a listener.
//!
//! Every operation goes through one dispatch step that checks the provisioning
//! features the operation needs (501 when none is enabled), tags the request
//! with an id for logging, and turns errors into SCIM error bodies.

pub mod core;
pub mod errors;
pub mod handlers;


pub use self::core::{ScimEndpoints, ScimOperation, ScimResponse};
pub use errors::{ERROR_SCHEMA, error_response};
pub use handlers::query::ListQuery;
