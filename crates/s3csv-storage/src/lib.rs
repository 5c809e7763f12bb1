//! Storage layer for the s3csv foreign data wrapper.

pub mod object_store;
pub mod tls;

pub use object_store::{
    AuthConfig, LocalBackend, ObjectReader, ObjectStore, ObjectStoreConfig, ObjectStoreError,
    ObjectStoreFactory, ObjectStoreResult, S3Backend, S3Credentials, StorageBackend,
};
pub use tls::{remove_dot, BucketCompaction, ExactHostname, HostnamePolicy};
