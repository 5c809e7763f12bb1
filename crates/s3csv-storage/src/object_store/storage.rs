//! Core object storage trait and backend factory.

use std::io::Read;

use tracing::debug;

use crate::object_store::{
    backends::{LocalBackend, S3Backend},
    config::{ObjectStoreConfig, StorageBackend},
    errors::ObjectStoreResult,
};

/// Forward-only byte stream over one object.
///
/// Dropping the reader closes the underlying body and connection.
pub type ObjectReader = Box<dyn Read + Send>;

/// Read access to objects in a single bucket.
pub trait ObjectStore: Send + Sync {
    /// Open `key` for sequential reading.
    fn open_read(&self, key: &str) -> ObjectStoreResult<ObjectReader>;

    /// Bucket this store reads from.
    fn bucket(&self) -> &str;

    /// Short backend name used in log lines.
    fn backend_name(&self) -> &'static str;

    /// Read the entire object into memory.
    fn read_to_end(&self, key: &str) -> ObjectStoreResult<Vec<u8>> {
        let mut reader = self.open_read(key)?;
        let mut contents = Vec::new();
        reader.read_to_end(&mut contents)?;
        Ok(contents)
    }
}

/// Create the backend described by `config`.
///
/// No network traffic happens here; S3 clients are built per read.
pub fn create_object_store(config: ObjectStoreConfig) -> ObjectStoreResult<Box<dyn ObjectStore>> {
    debug!(backend = config.backend.name(), bucket = %config.bucket, "Creating object store");

    match &config.backend {
        StorageBackend::S3 { .. } => Ok(Box::new(S3Backend::new(config)?)),
        StorageBackend::Local { .. } => Ok(Box::new(LocalBackend::new(config)?)),
    }
}
