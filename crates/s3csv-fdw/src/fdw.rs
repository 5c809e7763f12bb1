//! The foreign data wrapper exposed to the host.

use std::collections::HashMap;
use std::sync::Arc;

use s3csv_common::{FdwError, FdwResult};
use s3csv_storage::{ObjectStore, ObjectStoreFactory};
use tracing::{debug, error, info};

use crate::csv_rows::RowStream;
use crate::options::FdwOptions;

/// A restriction the host may pass down with a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Qual {
    pub field: String,
    pub operator: String,
    pub value: String,
}

impl Qual {
    pub fn new(field: impl Into<String>, operator: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }
}

impl std::fmt::Display for Qual {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator, self.value)
    }
}

/// Contract between the host and a wrapper instance.
///
/// An instance is created once per foreign table definition and may serve
/// many executions. Errors are fatal for the current statement.
pub trait ForeignDataWrapper: Sized {
    /// Validate `options` and remember the declared `columns`.
    fn new(options: &HashMap<String, String>, columns: Vec<String>) -> FdwResult<Self>;

    /// Produce the rows of one scan.
    fn execute(&self, quals: &[Qual], columns: &[String]) -> FdwResult<RowStream>;
}

/// Exposes one CSV object in an S3 bucket as a table.
pub struct S3CsvFdw {
    options: FdwOptions,
    columns: Arc<[String]>,
    store: Arc<dyn ObjectStore>,
}

impl S3CsvFdw {
    /// Create a wrapper reading through an existing store.
    ///
    /// Options are validated first, so an invalid definition never touches
    /// `store`. The store's bucket takes precedence over the `bucket` option.
    pub fn with_store(
        options: &HashMap<String, String>,
        columns: Vec<String>,
        store: Arc<dyn ObjectStore>,
    ) -> FdwResult<Self> {
        let options = FdwOptions::from_options(options)?;
        Ok(Self::from_parts(options, columns, store))
    }

    fn from_parts(options: FdwOptions, columns: Vec<String>, store: Arc<dyn ObjectStore>) -> Self {
        debug!(
            backend = store.backend_name(),
            bucket = store.bucket(),
            filename = %options.filename,
            columns = columns.len(),
            "Created S3 CSV wrapper"
        );

        Self {
            options,
            columns: columns.into(),
            store,
        }
    }

    pub fn options(&self) -> &FdwOptions {
        &self.options
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl ForeignDataWrapper for S3CsvFdw {
    fn new(options: &HashMap<String, String>, columns: Vec<String>) -> FdwResult<Self> {
        let options = FdwOptions::from_options(options)?;
        let store = ObjectStoreFactory::create(options.object_store_config())
            .map_err(|e| FdwError::invalid("endpoint", e.to_string()))?;

        Ok(Self::from_parts(options, columns, Arc::from(store)))
    }

    fn execute(&self, quals: &[Qual], columns: &[String]) -> FdwResult<RowStream> {
        if !quals.is_empty() {
            debug!(
                "Ignoring {} qual(s): {}",
                quals.len(),
                quals.iter().map(|q| q.to_string()).collect::<Vec<_>>().join(", ")
            );
        }
        if !columns.is_empty() && columns != &*self.columns {
            debug!("Ignoring requested columns {:?}; returning all declared columns", columns);
        }

        let reader = self.store.open_read(&self.options.filename).map_err(|e| {
            error!(
                bucket = self.store.bucket(),
                "Failed to fetch {}: {}", self.options.filename, e
            );
            FdwError::from(e)
        })?;

        info!(
            bucket = self.store.bucket(),
            "Reading CSV object {}", self.options.filename
        );

        Ok(RowStream::new(
            reader,
            &self.options.csv_format(),
            Arc::clone(&self.columns),
        ))
    }
}

impl std::fmt::Debug for S3CsvFdw {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3CsvFdw")
            .field("options", &self.options)
            .field("columns", &self.columns)
            .field("backend", &self.store.backend_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use s3csv_storage::{ObjectReader, ObjectStoreError, ObjectStoreResult};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory store that counts fetches.
    struct CountingStore {
        data: Option<Vec<u8>>,
        fetches: AtomicUsize,
    }

    impl CountingStore {
        fn with(data: &str) -> Arc<Self> {
            Arc::new(Self {
                data: Some(data.as_bytes().to_vec()),
                fetches: AtomicUsize::new(0),
            })
        }

        fn empty_bucket() -> Arc<Self> {
            Arc::new(Self {
                data: None,
                fetches: AtomicUsize::new(0),
            })
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl ObjectStore for CountingStore {
        fn open_read(&self, key: &str) -> ObjectStoreResult<ObjectReader> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            match &self.data {
                Some(data) => Ok(Box::new(Cursor::new(data.clone()))),
                None => Err(ObjectStoreError::NotFound {
                    key: key.to_string(),
                }),
            }
        }

        fn bucket(&self) -> &str {
            "memory"
        }

        fn backend_name(&self) -> &'static str {
            "memory"
        }
    }

    fn options(extra: &[(&str, &str)]) -> HashMap<String, String> {
        let mut map: HashMap<String, String> = [
            ("aws_access_key", "AKIDEXAMPLE"),
            ("aws_secret_key", "secret"),
            ("bucket", "memory"),
            ("filename", "users.csv"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in extra {
            map.insert(k.to_string(), v.to_string());
        }
        map
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_invalid_options_never_fetch() {
        let store = CountingStore::with("1\n");
        let mut opts = options(&[]);
        opts.remove("aws_secret_key");

        let err = S3CsvFdw::with_store(&opts, columns(&["id"]), store.clone()).unwrap_err();
        assert_eq!(err.to_string(), "You must set aws_secret_key");
        assert_eq!(store.fetches(), 0);
    }

    #[test]
    fn test_construction_does_not_fetch() {
        let store = CountingStore::with("1\n");
        let _fdw = S3CsvFdw::with_store(&options(&[]), columns(&["id"]), store.clone()).unwrap();
        assert_eq!(store.fetches(), 0);
    }

    #[test]
    fn test_execute_fetches_once_per_call_and_is_repeatable() {
        let store = CountingStore::with("id,name\n1,alice\n2,\n");
        let fdw = S3CsvFdw::with_store(
            &options(&[("skip_header", "1")]),
            columns(&["id", "name"]),
            store.clone(),
        )
        .unwrap();

        let first: Vec<_> = fdw.execute(&[], &[]).unwrap().collect::<FdwResult<_>>().unwrap();
        let second: Vec<_> = fdw.execute(&[], &[]).unwrap().collect::<FdwResult<_>>().unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(first[1].get("id"), Some("2"));
        assert_eq!(first[1].get("name"), None);
        assert_eq!(store.fetches(), 2);
    }

    #[test]
    fn test_quals_and_column_subset_are_ignored() {
        let store = CountingStore::with("1,alice\n2,bob\n");
        let fdw =
            S3CsvFdw::with_store(&options(&[]), columns(&["id", "name"]), store).unwrap();

        let quals = vec![Qual::new("id", "=", "1")];
        let rows: Vec<_> = fdw
            .execute(&quals, &columns(&["name"]))
            .unwrap()
            .collect::<FdwResult<_>>()
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("id"), Some("2"));
        assert_eq!(rows[1].get("name"), Some("bob"));
    }

    #[test]
    fn test_missing_object_is_fetch_error() {
        let fdw = S3CsvFdw::with_store(
            &options(&[]),
            columns(&["id"]),
            CountingStore::empty_bucket(),
        )
        .unwrap();

        let err = fdw.execute(&[], &[]).err().unwrap();
        assert_eq!(
            err.to_string(),
            "Error fetching or parsing S3 file: Object not found: users.csv"
        );
    }

    #[test]
    fn test_new_validates_before_building_store() {
        let err = S3CsvFdw::new(&HashMap::new(), columns(&["id"])).unwrap_err();
        assert_eq!(err.to_string(), "You must set aws_access_key");
    }

    #[test]
    fn test_new_with_custom_endpoint() {
        let fdw = S3CsvFdw::new(
            &options(&[("endpoint", "minio.local:9000")]),
            columns(&["id"]),
        )
        .unwrap();
        assert_eq!(
            fdw.options().endpoint.as_deref(),
            Some("https://minio.local:9000")
        );
        assert_eq!(fdw.columns(), &["id".to_string()]);
        assert!(format!("{:?}", fdw).contains("\"s3\""));
    }

    #[test]
    fn test_qual_display() {
        assert_eq!(Qual::new("age", ">", "30").to_string(), "age > 30");
    }
}
