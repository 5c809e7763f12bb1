//! Foreign data wrapper that exposes a single CSV object stored in S3, or
//! an S3-compatible service, as a read-only table.
//!
//! The host constructs an [`S3CsvFdw`] once per table definition with its
//! options and declared columns, then calls
//! [`execute`](ForeignDataWrapper::execute) for every scan. Each execution
//! fetches the object afresh and streams decoded [`Row`]s.

pub mod csv_rows;
pub mod fdw;
mod line_tracker;
pub mod options;
pub mod row;

pub use csv_rows::{CsvFormat, RowStream};
pub use fdw::{ForeignDataWrapper, Qual, S3CsvFdw};
pub use options::FdwOptions;
pub use row::Row;

pub use s3csv_common::{FdwError, FdwResult, SchemaWarning, Severity};
