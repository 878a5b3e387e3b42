//! Error types for SCIM connector operations.
//!
//! Errors are layered: the import cache reports [`CacheError`], datastores report
//! their own error type (see [`StoreError`] for the in-memory store), and every
//! request-facing operation surfaces a [`ScimError`] that knows which HTTP status
//! it maps onto.

use crate::cache::CacheError;
use crate::storage::StoreError;

/// Main error type for SCIM connector operations.
///
/// Client mistakes (bad filters, malformed bodies, unparseable query parameters)
/// are reported before any cache or lock state is touched. Everything raised from
/// the datastore or the filesystem is a server-side failure.
#[derive(Debug, thiserror::Error)]
pub enum ScimError {
    /// Filter expression could not be parsed or uses an unsupported operator
    #[error("Invalid filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    /// A query parameter did not hold a usable value
    #[error("Invalid value '{value}' for query parameter '{parameter}'")]
    InvalidParameter { parameter: String, value: String },

    /// Request body was not a valid SCIM resource
    #[error("Invalid request body: {0}")]
    InvalidBody(#[source] serde_json::Error),

    /// Credentials were missing or did not match the configured values
    #[error("Authentication failed: {message}")]
    Unauthorized { message: String },

    /// Resource not found errors
    #[error("Resource not found: {resource_type} with ID {id}")]
    ResourceNotFound { resource_type: String, id: String },

    /// A resource with the same ID already exists
    #[error("Resource already exists: {resource_type} with ID {id}")]
    Conflict { resource_type: String, id: String },

    /// Errors from the downstream datastore
    #[error("Datastore error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Import cache or lock marker I/O failures
    #[error("Import cache error: {0}")]
    Cache(#[from] CacheError),

    /// JSON serialization errors while building responses
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal server errors
    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl ScimError {
    /// Create an invalid filter error
    pub fn invalid_filter(filter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFilter {
            filter: filter.into(),
            message: message.into(),
        }
    }

    /// Create an invalid query parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
        }
    }

    /// Create an authentication failure
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a resource not found error
    pub fn resource_not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Wrap an arbitrary datastore error
    pub fn store_error<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Store(Box::new(error))
    }

    /// HTTP status code this error is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidFilter { .. } | Self::InvalidParameter { .. } | Self::InvalidBody(_) => 400,
            Self::Unauthorized { .. } => 401,
            Self::ResourceNotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::Store(_) | Self::Cache(_) | Self::Json(_) | Self::Internal { .. } => 500,
        }
    }

    /// Whether the caller is at fault (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

impl From<StoreError> for ScimError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::AlreadyExists { resource_type, id } => Self::Conflict { resource_type, id },
            other => Self::store_error(other),
        }
    }
}

pub type ScimResult<T> = Result<T, ScimError>;
