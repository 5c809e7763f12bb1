//! Rows handed to the host.

use std::sync::Arc;

/// One output row: a mapping from declared column name to text or null.
///
/// Only the first `len()` declared columns are present. A row shorter than
/// the declaration leaves the trailing columns absent, which the host
/// treats as null.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Option<String>>,
}

impl Row {
    pub(crate) fn new(columns: Arc<[String]>, values: Vec<Option<String>>) -> Self {
        debug_assert!(values.len() <= columns.len());
        Self { columns, values }
    }

    /// Value of `column`, `None` when null or absent.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.position(column)
            .and_then(|i| self.values.get(i))
            .and_then(|v| v.as_deref())
    }

    /// Whether the row carries a cell (possibly null) for `column`.
    pub fn contains(&self, column: &str) -> bool {
        self.position(column).map_or(false, |i| i < self.values.len())
    }

    /// Number of present cells.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }

    /// Present cells paired with their column names, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.columns
            .iter()
            .zip(self.values.iter())
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }
}
