//! Error types for object storage operations.

use s3csv_common::FdwError;
use thiserror::Error;

/// Result type for object storage operations
pub type ObjectStoreResult<T> = Result<T, ObjectStoreError>;

/// Failures raised while opening or reading an object.
///
/// The variants exist for logging. The wrapper collapses all of them into
/// a single [`FdwError::FetchOrParse`].
#[derive(Error, Debug)]
pub enum ObjectStoreError {
    /// Object or bucket not found
    #[error("Object not found: {key}")]
    NotFound { key: String },

    /// Access denied (authentication/authorization failure)
    #[error("Access denied: {message}")]
    AccessDenied { message: String },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Network/connectivity error, including unreachable endpoints
    #[error("Network error: {message}")]
    NetworkError { message: String },

    /// Operation timeout
    #[error("Operation timeout: {operation}")]
    Timeout { operation: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// AWS SDK error not covered above
    #[error("AWS error: {0}")]
    Aws(String),
}

impl ObjectStoreError {
    /// Whether the object or its bucket does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ObjectStoreError::NotFound { .. })
    }
}

impl From<ObjectStoreError> for FdwError {
    fn from(err: ObjectStoreError) -> Self {
        FdwError::FetchOrParse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = ObjectStoreError::NotFound {
            key: "exports/users.csv".to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Object not found: exports/users.csv");
    }

    #[test]
    fn test_every_variant_collapses_to_fetch_error() {
        let errors = vec![
            ObjectStoreError::NotFound { key: "k".to_string() },
            ObjectStoreError::AccessDenied { message: "denied".to_string() },
            ObjectStoreError::NetworkError { message: "refused".to_string() },
            ObjectStoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "boom")),
        ];

        for err in errors {
            let message = err.to_string();
            match FdwError::from(err) {
                FdwError::FetchOrParse(inner) => assert_eq!(inner, message),
                other => panic!("Expected FetchOrParse, got {:?}", other),
            }
        }
    }
}
