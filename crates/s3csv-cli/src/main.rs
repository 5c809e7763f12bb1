//! s3csv command-line tool.
//!
//! Plays the host's role: builds the wrapper from table options, runs one
//! scan and prints the rows.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use s3csv_fdw::{FdwError, FdwOptions, ForeignDataWrapper, S3CsvFdw, SchemaWarning, Severity};
use s3csv_storage::{ObjectStoreConfig, ObjectStoreFactory};
use tracing::debug;

mod output;
mod telemetry;

use output::{OutputFormat, RowWriter};

/// Read a CSV object from S3 as a table
#[derive(Parser, Debug)]
#[command(name = "s3csv-ctl")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Table option as KEY=VALUE, e.g. bucket=exports (repeatable)
    #[arg(short = 'O', long = "option", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    options: Vec<(String, String)>,

    /// Declared column name, in table order (repeatable)
    #[arg(short, long = "column", value_name = "NAME", required = true)]
    columns: Vec<String>,

    /// Serve objects from <DIR>/<bucket>/<filename> instead of S3
    #[arg(long, value_name = "DIR")]
    local_root: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

/// Fill credential options from the standard AWS environment variables.
fn apply_env_credentials(
    options: &mut HashMap<String, String>,
    lookup: impl Fn(&str) -> Option<String>,
) {
    for (option, var) in [
        ("aws_access_key", "AWS_ACCESS_KEY_ID"),
        ("aws_secret_key", "AWS_SECRET_ACCESS_KEY"),
    ] {
        if !options.contains_key(option) {
            if let Some(value) = lookup(var) {
                debug!("Using {} for {}", var, option);
                options.insert(option.to_string(), value);
            }
        }
    }
}

fn build_wrapper(cli: &Cli, options: &HashMap<String, String>) -> Result<S3CsvFdw> {
    let fdw = match &cli.local_root {
        Some(root) => {
            let parsed = FdwOptions::from_options(options)?;
            let config = ObjectStoreConfig::local(root.to_string_lossy(), parsed.bucket);
            let store = ObjectStoreFactory::create(config)?;
            S3CsvFdw::with_store(options, cli.columns.clone(), Arc::from(store))?
        }
        None => S3CsvFdw::new(options, cli.columns.clone())?,
    };
    Ok(fdw)
}

/// Run one scan, writing rows to `out` as they arrive.
///
/// A stream error ends the scan, but the rows yielded before it are still
/// written out before the error is returned.
fn run(cli: &Cli, options: &HashMap<String, String>, out: &mut impl Write) -> Result<Vec<SchemaWarning>> {
    let fdw = build_wrapper(cli, options)?;

    let mut stream = fdw.execute(&[], &cli.columns)?;
    let mut writer = RowWriter::new(out, fdw.columns(), cli.output)?;

    let mut failure = None;
    for row in stream.by_ref() {
        match row {
            Ok(row) => writer.write_row(&row)?,
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }
    writer.finish()?;
    debug!(rows = stream.rows_emitted(), "Scan complete");

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(stream.warnings().to_vec()),
    }
}

/// Host severity of a CLI failure. Errors raised outside the wrapper are
/// always fatal.
fn severity_of(err: &anyhow::Error) -> Severity {
    err.downcast_ref::<FdwError>()
        .map_or(Severity::Error, FdwError::severity)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = telemetry::init(&cli.log_level) {
        output::print_error(&format!("{:#}", e));
        return ExitCode::FAILURE;
    }

    let mut options: HashMap<String, String> = cli.options.iter().cloned().collect();
    apply_env_credentials(&mut options, |var| std::env::var(var).ok());

    let stdout = std::io::stdout();
    match run(&cli, &options, &mut stdout.lock()) {
        Ok(warnings) => {
            for warning in warnings {
                output::report(warning.severity(), &warning.to_string());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            output::report(severity_of(&e), &format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["s3csv-ctl"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn local_bucket(contents: &str) -> TempDir {
        local_bucket_bytes(contents.as_bytes())
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("bucket=exports").unwrap(),
            ("bucket".to_string(), "exports".to_string())
        );
        assert_eq!(
            parse_key_value("delimiter==").unwrap(),
            ("delimiter".to_string(), "=".to_string())
        );
        assert!(parse_key_value("bucket").is_err());
        assert!(parse_key_value("=value").is_err());
    }

    #[test]
    fn test_columns_are_required() {
        assert!(Cli::try_parse_from(["s3csv-ctl", "-O", "bucket=b"]).is_err());
    }

    #[test]
    fn test_env_credentials_do_not_override_options() {
        let mut options = HashMap::from([("aws_access_key".to_string(), "explicit".to_string())]);
        apply_env_credentials(&mut options, |var| Some(format!("from-{}", var)));

        assert_eq!(options["aws_access_key"], "explicit");
        assert_eq!(options["aws_secret_key"], "from-AWS_SECRET_ACCESS_KEY");
    }

    #[test]
    fn test_run_against_local_root() {
        let dir = local_bucket("id,name\n1,alice\n2,\n");
        let root = dir.path().to_string_lossy().to_string();
        let cli = cli(&[
            "-O", "aws_access_key=AKIDEXAMPLE",
            "-O", "aws_secret_key=secret",
            "-O", "bucket=exports",
            "-O", "filename=users.csv",
            "-O", "header=true",
            "-c", "id",
            "-c", "name",
            "--local-root", &root,
            "--output", "csv",
        ]);
        let options: HashMap<_, _> = cli.options.iter().cloned().collect();

        let mut out = Vec::new();
        let warnings = run(&cli, &options, &mut out).unwrap();

        assert!(warnings.is_empty());
        assert_eq!(String::from_utf8(out).unwrap(), "id,name\n1,alice\n2,\n");
    }

    #[test]
    fn test_run_reports_width_warning() {
        let dir = local_bucket("1,2,3\n");
        let root = dir.path().to_string_lossy().to_string();
        let cli = cli(&[
            "-O", "aws_access_key=a",
            "-O", "aws_secret_key=s",
            "-O", "bucket=exports",
            "-O", "filename=users.csv",
            "-c", "a",
            "--local-root", &root,
            "--output", "json",
        ]);
        let options: HashMap<_, _> = cli.options.iter().cloned().collect();

        let mut out = Vec::new();
        let warnings = run(&cli, &options, &mut out).unwrap();
        assert_eq!(warnings, vec![SchemaWarning::MoreColumns { fields: 3, columns: 1 }]);
    }

    fn local_bucket_bytes(contents: &[u8]) -> TempDir {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("exports");
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("users.csv"), contents).unwrap();
        dir
    }

    fn scan_args<'a>(root: &'a str, output: &'a str) -> Vec<&'a str> {
        vec![
            "-O", "aws_access_key=a",
            "-O", "aws_secret_key=s",
            "-O", "bucket=exports",
            "-O", "filename=users.csv",
            "-c", "id",
            "-c", "name",
            "--local-root", root,
            "--output", output,
        ]
    }

    #[test]
    fn test_rows_before_stream_error_are_written() {
        let dir = local_bucket_bytes(b"1,ok\n2,\xc3\x28\n3,never\n");
        let root = dir.path().to_string_lossy().to_string();

        let cli = cli(&scan_args(&root, "csv"));
        let options: HashMap<_, _> = cli.options.iter().cloned().collect();
        let mut out = Vec::new();
        let err = run(&cli, &options, &mut out).unwrap_err();

        assert!(err.to_string().starts_with("Error fetching or parsing S3 file"));
        assert_eq!(severity_of(&err), Severity::Error);
        assert_eq!(String::from_utf8(out).unwrap(), "id,name\n1,ok\n");
    }

    #[test]
    fn test_json_closed_after_stream_error() {
        let dir = local_bucket_bytes(b"1,ok\n2,\xc3\x28\n");
        let root = dir.path().to_string_lossy().to_string();

        let cli = cli(&scan_args(&root, "json"));
        let options: HashMap<_, _> = cli.options.iter().cloned().collect();
        let mut out = Vec::new();
        assert!(run(&cli, &options, &mut out).is_err());

        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, serde_json::json!([{"id": "1", "name": "ok"}]));
    }

    #[test]
    fn test_run_missing_option_fails() {
        let cli = cli(&["-O", "bucket=exports", "-c", "id"]);
        let options: HashMap<_, _> = cli.options.iter().cloned().collect();

        let err = run(&cli, &options, &mut Vec::new()).unwrap_err();
        assert_eq!(err.to_string(), "You must set aws_access_key");
        assert_eq!(severity_of(&err), Severity::Error);
    }
}
