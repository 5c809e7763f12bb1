//! Object storage abstraction used by the wrapper.
//!
//! - Blocking, pull-based reads through [`ObjectStore::open_read`]
//! - AWS S3 and S3-compatible endpoints (MinIO, Ceph, ...) via the AWS SDK
//! - Local directory trees laid out as `<root>/<bucket>/<key>`
//! - Static access key authentication

pub mod auth;
pub mod backends;
pub mod config;
pub mod errors;
pub mod storage;

pub use auth::{AuthConfig, S3Credentials};
pub use backends::{LocalBackend, S3Backend};
pub use config::{normalize_endpoint, ObjectStoreConfig, StorageBackend, DEFAULT_REGION};
pub use errors::{ObjectStoreError, ObjectStoreResult};
pub use storage::{create_object_store, ObjectReader, ObjectStore};

/// Default object store implementation factory
pub struct ObjectStoreFactory;

impl ObjectStoreFactory {
    /// Create a new object store instance from configuration
    pub fn create(config: ObjectStoreConfig) -> ObjectStoreResult<Box<dyn ObjectStore>> {
        storage::create_object_store(config)
    }
}
