//! Streaming CSV decoding from an object reader into [`Row`]s.
//!
//! Lines are pulled from the underlying reader one at a time, so only
//! the csv crate's buffer and the current record are held in memory.

use std::io::Read;
use std::iter::FusedIterator;
use std::sync::Arc;

use csv::{ReaderBuilder, StringRecord};
use s3csv_common::{FdwError, FdwResult, SchemaWarning};
use s3csv_storage::ObjectReader;
use tracing::{debug, error, warn};

use crate::line_tracker::LineTracker;
use crate::row::Row;

/// Dialect settings for decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvFormat {
    pub delimiter: u8,
    pub quote: u8,
    /// Leading lines to discard, blank lines included
    pub skip_header: usize,
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            skip_header: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line {
    Blank,
    Record,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Streaming,
    Done,
    Failed,
}

/// Lazy, finite, single-pass sequence of rows for one execution.
///
/// Yields at most one `Err`, after which it is exhausted. The underlying
/// reader is released as soon as the stream finishes or fails, or when the
/// stream is dropped early.
pub struct RowStream<R: Read = ObjectReader> {
    reader: Option<csv::Reader<LineTracker<R>>>,
    record: StringRecord,
    pending_blanks: usize,
    record_pending: bool,
    columns: Arc<[String]>,
    skip_remaining: usize,
    width_checked: bool,
    state: StreamState,
    warnings: Vec<SchemaWarning>,
    rows_emitted: u64,
}

impl<R: Read> RowStream<R> {
    pub fn new(source: R, format: &CsvFormat, columns: Arc<[String]>) -> Self {
        let reader = ReaderBuilder::new()
            .delimiter(format.delimiter)
            .quote(format.quote)
            .has_headers(false)
            .flexible(true)
            .from_reader(LineTracker::new(source, format.delimiter, format.quote));

        Self {
            reader: Some(reader),
            record: StringRecord::new(),
            pending_blanks: 0,
            record_pending: false,
            columns,
            skip_remaining: format.skip_header,
            width_checked: false,
            state: StreamState::Streaming,
            warnings: Vec::new(),
            rows_emitted: 0,
        }
    }

    /// Schema warnings raised so far. At most one per execution.
    pub fn warnings(&self) -> &[SchemaWarning] {
        &self.warnings
    }

    pub fn rows_emitted(&self) -> u64 {
        self.rows_emitted
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn check_width(&mut self, fields: usize) {
        self.width_checked = true;
        if let Some(warning) = SchemaWarning::check(fields, self.columns.len()) {
            warn!(fields, columns = self.columns.len(), "{}", warning);
            self.warnings.push(warning);
        }
    }

    /// Next logical line. Blank lines come back in their original position
    /// relative to the records around them.
    fn next_line(&mut self) -> Option<Result<Line, csv::Error>> {
        loop {
            if self.pending_blanks > 0 {
                self.pending_blanks -= 1;
                return Some(Ok(Line::Blank));
            }
            if self.record_pending {
                self.record_pending = false;
                return Some(Ok(Line::Record));
            }

            let reader = self.reader.as_mut()?;
            match reader.read_record(&mut self.record) {
                Ok(true) => {
                    self.pending_blanks = reader.get_mut().take_record();
                    self.record_pending = true;
                }
                Ok(false) => {
                    let trailing = reader.get_mut().take_blanks();
                    if trailing == 0 {
                        return None;
                    }
                    self.pending_blanks = trailing;
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }

    fn current_row(&self) -> Row {
        let values = self
            .record
            .iter()
            .take(self.columns.len())
            .map(|field| {
                if field.is_empty() {
                    None
                } else {
                    Some(field.to_string())
                }
            })
            .collect();

        Row::new(Arc::clone(&self.columns), values)
    }

    fn finish(&mut self, state: StreamState) {
        self.state = state;
        self.reader = None;
    }
}

impl<R: Read> Iterator for RowStream<R> {
    type Item = FdwResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state != StreamState::Streaming {
            return None;
        }

        loop {
            match self.next_line() {
                Some(Ok(line)) => {
                    if self.skip_remaining > 0 {
                        self.skip_remaining -= 1;
                        continue;
                    }

                    let fields = match line {
                        Line::Blank => 0,
                        Line::Record => self.record.len(),
                    };
                    if !self.width_checked {
                        self.check_width(fields);
                    }

                    self.rows_emitted += 1;
                    let row = match line {
                        Line::Blank => Row::new(Arc::clone(&self.columns), Vec::new()),
                        Line::Record => self.current_row(),
                    };
                    return Some(Ok(row));
                }
                None => {
                    debug!(rows = self.rows_emitted, "Finished reading CSV object");
                    self.finish(StreamState::Done);
                    return None;
                }
                Some(Err(e)) => {
                    error!(rows = self.rows_emitted, "Failed to decode CSV record: {}", e);
                    self.finish(StreamState::Failed);
                    return Some(Err(FdwError::FetchOrParse(e.to_string())));
                }
            }
        }
    }
}

impl<R: Read> FusedIterator for RowStream<R> {}
