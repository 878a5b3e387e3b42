//! Errors raised by the bundled datastore.

use std::fmt;

/// Errors that can occur during datastore operations.
///
/// These say nothing about HTTP or SCIM; the conversion into
/// [`ScimError`](crate::error::ScimError) decides how each one is reported.
#[derive(Debug)]
pub enum StoreError {
    /// A record with this id is already stored.
    AlreadyExists { resource_type: String, id: String },

    /// The backend cannot serve requests right now.
    Unavailable { message: String },

    /// Stored or seeded data could not be decoded.
    Serialization { message: String },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::AlreadyExists { resource_type, id } => {
                write!(f, "Resource already exists: {}/{}", resource_type, id)
            }
            StoreError::Unavailable { message } => {
                write!(f, "Datastore unavailable: {}", message)
            }
            StoreError::Serialization { message } => {
                write!(f, "Serialization error: {}", message)
            }
        }
    }
}

impl std::error::Error for StoreError {}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Serialization {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let error = StoreError::AlreadyExists {
            resource_type: "User".to_string(),
            id: "u-1".to_string(),
        };
        assert_eq!(error.to_string(), "Resource already exists: User/u-1");
        assert_eq!(
            StoreError::unavailable("connection refused").to_string(),
            "Datastore unavailable: connection refused"
        );
    }
}
