//! Error types surfaced to the FDW host.

use thiserror::Error;

/// Result type alias for wrapper operations.
pub type FdwResult<T> = std::result::Result<T, FdwError>;

/// Errors reported to the host.
///
/// Every variant is fatal for the statement that triggered it. Schema
/// shape problems are not errors; see [`SchemaWarning`].
#[derive(Error, Debug)]
pub enum FdwError {
    /// A required option was not supplied
    #[error("You must set {option}")]
    MissingOption { option: String },

    /// An option was supplied with a value that cannot be used
    #[error("Invalid value for option {option}: {reason}")]
    InvalidOption { option: String, reason: String },

    /// Any failure while retrieving or decoding the object
    #[error("Error fetching or parsing S3 file: {0}")]
    FetchOrParse(String),
}

impl FdwError {
    /// Shorthand for [`FdwError::MissingOption`].
    pub fn missing(option: impl Into<String>) -> Self {
        FdwError::MissingOption {
            option: option.into(),
        }
    }

    /// Shorthand for [`FdwError::InvalidOption`].
    pub fn invalid(option: impl Into<String>, reason: impl Into<String>) -> Self {
        FdwError::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error was raised while validating options.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            FdwError::MissingOption { .. } | FdwError::InvalidOption { .. }
        )
    }

    /// Host severity for this error. Always [`Severity::Error`].
    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

/// Message levels understood by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    /// Aborts the current statement
    Error,
}

/// Non-fatal mismatch between the object's row width and the declared columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaWarning {
    /// The first data row has more fields than declared columns.
    MoreColumns { fields: usize, columns: usize },
    /// The first data row has fewer fields than declared columns.
    FewerColumns { fields: usize, columns: usize },
}

impl SchemaWarning {
    /// Compare a row width against the declared column count.
    pub fn check(fields: usize, columns: usize) -> Option<Self> {
        match fields.cmp(&columns) {
            std::cmp::Ordering::Greater => Some(SchemaWarning::MoreColumns { fields, columns }),
            std::cmp::Ordering::Less => Some(SchemaWarning::FewerColumns { fields, columns }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Warning
    }
}

impl std::fmt::Display for SchemaWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaWarning::MoreColumns { .. } => {
                write!(f, "There are more columns than defined in the table")
            }
            SchemaWarning::FewerColumns { .. } => {
                write!(f, "There are fewer columns than defined in the table")
            }
        }
    }
}
