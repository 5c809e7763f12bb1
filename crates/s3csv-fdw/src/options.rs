//! Table options supplied by the host, parsed into a typed configuration.

use std::collections::HashMap;

use s3csv_common::{FdwError, FdwResult};
use s3csv_storage::object_store::{
    normalize_endpoint, ObjectStoreConfig, S3Credentials, DEFAULT_REGION,
};
use tracing::debug;

use crate::csv_rows::CsvFormat;

/// Every option key the wrapper understands.
const KNOWN_OPTIONS: &[&str] = &[
    "aws_access_key",
    "aws_secret_key",
    "bucket",
    "bucketname",
    "filename",
    "hostname",
    "endpoint",
    "delimiter",
    "quotechar",
    "quote",
    "skip_header",
    "header",
    "region",
    "force_path_style",
];

/// Validated wrapper configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct FdwOptions {
    pub access_key: String,
    pub secret_key: String,
    /// Custom S3-compatible endpoint, always with a scheme
    pub endpoint: Option<String>,
    pub bucket: String,
    /// Object key of the CSV file
    pub filename: String,
    pub delimiter: u8,
    pub quote: u8,
    /// Leading records to discard before data rows
    pub skip_header: usize,
    pub region: String,
    pub force_path_style: bool,
}

impl FdwOptions {
    /// Parse and validate the host's option map.
    ///
    /// Required keys are checked first, in a fixed order, so a missing
    /// credential is reported before any other problem.
    pub fn from_options(options: &HashMap<String, String>) -> FdwResult<Self> {
        let access_key = require_option("aws_access_key", options)?;
        let secret_key = require_option("aws_secret_key", options)?;
        let bucket = options
            .get("bucket")
            .or_else(|| options.get("bucketname"))
            .ok_or_else(|| FdwError::missing("bucket"))?;
        let filename = require_option("filename", options)?;

        let endpoint = options.get("endpoint").and_then(|raw| normalize_endpoint(raw));
        if let Some(endpoint) = &endpoint {
            debug!("Using custom endpoint: {}", endpoint);
        }

        let delimiter = match options.get("delimiter") {
            Some(value) => parse_char("delimiter", value)?,
            None => b',',
        };

        let quote = match lookup(options, &["quotechar", "quote"]) {
            Some((key, value)) => parse_char(key, value)?,
            None => b'"',
        };

        if delimiter == quote {
            return Err(FdwError::invalid(
                "delimiter",
                "delimiter and quote character must differ",
            ));
        }

        let skip_header = match lookup(options, &["skip_header", "header"]) {
            Some((key, value)) => parse_skip_header(key, value)?,
            None => 0,
        };

        let region = options
            .get("region")
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REGION)
            .to_string();

        let force_path_style = match options.get("force_path_style") {
            Some(value) => parse_bool("force_path_style", value)?,
            None => false,
        };

        if let Some(hostname) = options.get("hostname") {
            debug!("Ignoring hostname option: {}", hostname);
        }

        for key in options.keys() {
            if !KNOWN_OPTIONS.contains(&key.as_str()) {
                debug!("Ignoring unknown option: {}", key);
            }
        }

        Ok(Self {
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
            endpoint,
            bucket: bucket.to_string(),
            filename: filename.to_string(),
            delimiter,
            quote,
            skip_header,
            region,
            force_path_style,
        })
    }

    /// Storage configuration for the S3 backend.
    pub fn object_store_config(&self) -> ObjectStoreConfig {
        let mut config = ObjectStoreConfig::s3(&self.bucket, &self.region)
            .with_path_style(self.force_path_style)
            .with_credentials(S3Credentials::access_key(&self.access_key, &self.secret_key));

        if let Some(endpoint) = &self.endpoint {
            config = config.with_endpoint(endpoint);
        }

        config
    }

    pub fn csv_format(&self) -> CsvFormat {
        CsvFormat {
            delimiter: self.delimiter,
            quote: self.quote,
            skip_header: self.skip_header,
        }
    }
}

impl std::fmt::Debug for FdwOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FdwOptions")
            .field("access_key", &self.access_key)
            .field("secret_key", &"** redacted **")
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .field("filename", &self.filename)
            .field("delimiter", &(self.delimiter as char))
            .field("quote", &(self.quote as char))
            .field("skip_header", &self.skip_header)
            .field("region", &self.region)
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

/// Get a required option or fail with [`FdwError::MissingOption`].
pub fn require_option<'a>(name: &str, options: &'a HashMap<String, String>) -> FdwResult<&'a str> {
    options
        .get(name)
        .map(|v| v.as_str())
        .ok_or_else(|| FdwError::missing(name))
}

/// First key from `keys` present in `options`.
fn lookup<'a>(
    options: &'a HashMap<String, String>,
    keys: &[&'static str],
) -> Option<(&'static str, &'a str)> {
    keys.iter()
        .find_map(|key| options.get(*key).map(|value| (*key, value.as_str())))
}

/// A single ASCII character. `\t` is accepted as an alias for tab.
fn parse_char(option: &str, value: &str) -> FdwResult<u8> {
    if value == "\\t" {
        return Ok(b'\t');
    }

    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c as u8),
        (Some(_), None) => Err(FdwError::invalid(option, "must be an ASCII character")),
        _ => Err(FdwError::invalid(
            option,
            format!("must be a single character, got {:?}", value),
        )),
    }
}

/// A non-negative record count, or a boolean meaning one record or none.
fn parse_skip_header(option: &str, value: &str) -> FdwResult<usize> {
    let trimmed = value.trim();
    if let Ok(count) = trimmed.parse::<usize>() {
        return Ok(count);
    }

    parse_bool(option, trimmed)
        .map(usize::from)
        .map_err(|_| {
            FdwError::invalid(
                option,
                format!("expected a non-negative integer or boolean, got {:?}", value),
            )
        })
}

fn parse_bool(option: &str, value: &str) -> FdwResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "on" | "1" => Ok(true),
        "false" | "f" | "no" | "n" | "off" | "0" => Ok(false),
        _ => Err(FdwError::invalid(
            option,
            format!("expected a boolean, got {:?}", value),
        )),
    }
}
