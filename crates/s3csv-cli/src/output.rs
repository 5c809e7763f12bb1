//! Output formatting utilities.

use std::io::Write;

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use s3csv_fdw::{Row, Severity};
use serde_json::{Map, Value};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON array of objects
    Json,
    /// CSV with a header line
    Csv,
}

/// Writes rows to `out` as the stream yields them.
///
/// Tables need every row to size their columns, so they are buffered until
/// [`RowWriter::finish`]. JSON and CSV rows are flushed one at a time.
pub struct RowWriter<W: Write> {
    columns: Vec<String>,
    sink: Sink<W>,
}

enum Sink<W: Write> {
    Table { out: W, builder: Builder },
    Json { out: W, rows: usize },
    Csv(csv::Writer<W>),
}

impl<W: Write> RowWriter<W> {
    pub fn new(out: W, columns: &[String], format: OutputFormat) -> Result<Self> {
        let sink = match format {
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(columns.iter().cloned());
                Sink::Table { out, builder }
            }
            OutputFormat::Json => Sink::Json { out, rows: 0 },
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(out);
                writer.write_record(columns)?;
                writer.flush()?;
                Sink::Csv(writer)
            }
        };

        Ok(Self {
            columns: columns.to_vec(),
            sink,
        })
    }

    pub fn write_row(&mut self, row: &Row) -> Result<()> {
        let columns = &self.columns;
        match &mut self.sink {
            Sink::Table { builder, .. } => {
                builder.push_record(
                    columns
                        .iter()
                        .map(|c| row.get(c).unwrap_or_default().to_string()),
                );
            }
            Sink::Json { out, rows } => {
                let separator: &[u8] = if *rows == 0 { b"[\n  " } else { b",\n  " };
                out.write_all(separator)?;
                serde_json::to_writer(&mut *out, &json_object(row, columns))?;
                out.flush()?;
                *rows += 1;
            }
            Sink::Csv(writer) => {
                writer.write_record(columns.iter().map(|c| row.get(c).unwrap_or_default()))?;
                writer.flush()?;
            }
        }
        Ok(())
    }

    /// Close the output. Must run even when the stream failed, so the rows
    /// written so far form a complete document.
    pub fn finish(self) -> Result<()> {
        match self.sink {
            Sink::Table { mut out, builder } => {
                let mut table = builder.build();
                table
                    .with(Style::modern())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));
                writeln!(out, "{}", table)?;
                out.flush()?;
            }
            Sink::Json { mut out, rows } => {
                let closing: &[u8] = if rows == 0 { b"[]\n" } else { b"\n]\n" };
                out.write_all(closing)?;
                out.flush()?;
            }
            Sink::Csv(writer) => {
                writer.into_inner().map_err(|e| e.into_error())?;
            }
        }
        Ok(())
    }
}

fn json_object(row: &Row, columns: &[String]) -> Value {
    let object: Map<String, Value> = columns
        .iter()
        .map(|c| {
            let value = row
                .get(c)
                .map_or(Value::Null, |v| Value::String(v.to_string()));
            (c.clone(), value)
        })
        .collect();
    Value::Object(object)
}

fn marker(severity: Severity) -> &'static str {
    match severity {
        Severity::Warning => "⚠",
        Severity::Error => "✗",
    }
}

/// Print a diagnostic to stderr, marked by its severity.
pub fn report(severity: Severity, message: &str) {
    let symbol = match severity {
        Severity::Warning => marker(severity).yellow(),
        Severity::Error => marker(severity).red(),
    };
    eprintln!("{} {}", symbol.bold(), message);
}

/// Print error message
pub fn print_error(message: &str) {
    report(Severity::Error, message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use s3csv_fdw::{CsvFormat, FdwResult, RowStream};
    use std::io::Cursor;
    use std::sync::Arc;

    fn render(data: &str, names: &[&str], format: OutputFormat) -> String {
        let columns: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        let rows = RowStream::new(
            Cursor::new(data.as_bytes().to_vec()),
            &CsvFormat::default(),
            Arc::from(columns.clone()),
        )
        .collect::<FdwResult<Vec<_>>>()
        .unwrap();

        let mut out = Vec::new();
        let mut writer = RowWriter::new(&mut out, &columns, format).unwrap();
        for row in &rows {
            writer.write_row(row).unwrap();
        }
        writer.finish().unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_json_uses_null_for_missing_values() {
        let rendered = render("1,,x\n2\n", &["id", "name", "tag"], OutputFormat::Json);
        let parsed: Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(
            parsed,
            serde_json::json!([
                {"id": "1", "name": null, "tag": "x"},
                {"id": "2", "name": null, "tag": null}
            ])
        );
    }

    #[test]
    fn test_json_without_rows_is_empty_array() {
        let rendered = render("", &["id"], OutputFormat::Json);
        assert_eq!(rendered, "[]\n");
    }

    #[test]
    fn test_csv_output_has_header() {
        let rendered = render("1,\"a,b\"\n", &["id", "name"], OutputFormat::Csv);
        assert_eq!(rendered, "id,name\n1,\"a,b\"\n");
    }

    #[test]
    fn test_csv_rows_written_before_finish() {
        let columns = vec!["id".to_string()];
        let format = CsvFormat::default();
        let row = RowStream::new(Cursor::new(b"7\n".to_vec()), &format, Arc::from(columns.clone()))
            .next()
            .unwrap()
            .unwrap();

        let mut out = Vec::new();
        let mut writer = RowWriter::new(&mut out, &columns, OutputFormat::Csv).unwrap();
        writer.write_row(&row).unwrap();
        drop(writer);
        assert_eq!(out, b"id\n7\n");
    }

    #[test]
    fn test_table_contains_headers_and_values() {
        let rendered = render("1,alice\n", &["id", "name"], OutputFormat::Table);
        assert!(rendered.contains("id"));
        assert!(rendered.contains("name"));
        assert!(rendered.contains("alice"));
    }

    #[test]
    fn test_marker_follows_severity() {
        let warning = s3csv_fdw::SchemaWarning::MoreColumns { fields: 2, columns: 1 };
        assert_eq!(marker(warning.severity()), "⚠");
        assert_eq!(marker(s3csv_fdw::FdwError::missing("bucket").severity()), "✗");
    }
}
