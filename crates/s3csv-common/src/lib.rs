//! Common types shared across the s3csv crates.

pub mod error;

pub use error::{FdwError, FdwResult, SchemaWarning, Severity};
