//! Local filesystem backend implementation.

use std::fs::File;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::{debug, instrument};

use crate::object_store::{
    config::{ObjectStoreConfig, StorageBackend},
    errors::{ObjectStoreError, ObjectStoreResult},
    storage::{ObjectReader, ObjectStore},
};

/// Serves objects from `<root>/<bucket>/<key>`.
#[derive(Debug)]
pub struct LocalBackend {
    root_path: PathBuf,
    bucket: String,
}

impl LocalBackend {
    /// Create a new local backend. The root directory must already exist.
    pub fn new(config: ObjectStoreConfig) -> ObjectStoreResult<Self> {
        let root_path = match &config.backend {
            StorageBackend::Local { path } => PathBuf::from(path),
            _ => {
                return Err(ObjectStoreError::InvalidConfiguration {
                    message: "Expected Local backend configuration".to_string(),
                })
            }
        };

        if !root_path.is_dir() {
            return Err(ObjectStoreError::InvalidConfiguration {
                message: format!("Root directory does not exist: {}", root_path.display()),
            });
        }

        debug!("Created local backend at path: {:?}", root_path);

        Ok(Self {
            root_path,
            bucket: config.bucket,
        })
    }

    /// Build the full path for a key. Empty, `.` and `..` components are dropped.
    fn build_path(&self, key: &str) -> PathBuf {
        let mut path = self.root_path.join(&self.bucket);

        for component in key.split('/') {
            if !component.is_empty() && component != "." && component != ".." {
                path = path.join(component);
            }
        }

        path
    }
}

impl ObjectStore for LocalBackend {
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    fn open_read(&self, key: &str) -> ObjectStoreResult<ObjectReader> {
        let path = self.build_path(key);

        let file = File::open(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ObjectStoreError::NotFound {
                key: key.to_string(),
            },
            ErrorKind::PermissionDenied => ObjectStoreError::AccessDenied {
                message: format!("{}: {}", path.display(), e),
            },
            _ => ObjectStoreError::Io(e),
        })?;

        debug!("Opened local object: {:?}", path);
        Ok(Box::new(file))
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
