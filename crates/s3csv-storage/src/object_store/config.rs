//! Configuration structures for object storage backends.

use serde::{Deserialize, Serialize};

use crate::object_store::auth::{AuthConfig, S3Credentials};

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Main configuration for object storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    /// Storage backend configuration
    pub backend: StorageBackend,

    /// Bucket name
    pub bucket: String,

    /// Authentication configuration
    pub auth: AuthConfig,
}

impl ObjectStoreConfig {
    /// S3 configuration against the public AWS endpoint.
    pub fn s3(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            backend: StorageBackend::S3 {
                region: region.into(),
                endpoint: None,
                force_path_style: false,
            },
            bucket: bucket.into(),
            auth: AuthConfig::None,
        }
    }

    /// Local filesystem configuration rooted at `path`.
    pub fn local(path: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            backend: StorageBackend::Local { path: path.into() },
            bucket: bucket.into(),
            auth: AuthConfig::None,
        }
    }

    /// Use a custom S3-compatible endpoint. Ignored for non-S3 backends.
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        if let StorageBackend::S3 { endpoint, .. } = &mut self.backend {
            *endpoint = Some(url.into());
        }
        self
    }

    /// Address buckets in the URL path instead of the hostname.
    pub fn with_path_style(mut self, enabled: bool) -> Self {
        if let StorageBackend::S3 {
            force_path_style, ..
        } = &mut self.backend
        {
            *force_path_style = enabled;
        }
        self
    }

    pub fn with_credentials(mut self, credentials: S3Credentials) -> Self {
        self.auth = AuthConfig::S3(credentials);
        self
    }
}

/// Storage backend types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageBackend {
    /// AWS S3 or S3-compatible storage (MinIO, Ceph, ...)
    S3 {
        /// S3 region
        region: String,
        /// Custom endpoint for S3-compatible storage, scheme included
        endpoint: Option<String>,
        /// Force path-style addressing
        #[serde(default)]
        force_path_style: bool,
    },

    /// Local filesystem, objects stored as `<path>/<bucket>/<key>`
    Local {
        /// Root path for storage
        path: String,
    },
}

impl StorageBackend {
    pub fn name(&self) -> &'static str {
        match self {
            StorageBackend::S3 { .. } => "s3",
            StorageBackend::Local { .. } => "local",
        }
    }
}

/// Normalize a user-supplied endpoint.
///
/// Blank input yields `None`. A value without an `http://` or `https://`
/// scheme gets `https://` prepended.
pub fn normalize_endpoint(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Some(trimmed.to_string())
    } else {
        Some(format!("https://{}", trimmed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(
            normalize_endpoint("s3.example.com"),
            Some("https://s3.example.com".to_string())
        );
        assert_eq!(
            normalize_endpoint("http://localhost:9000"),
            Some("http://localhost:9000".to_string())
        );
        assert_eq!(
            normalize_endpoint("https://minio.internal"),
            Some("https://minio.internal".to_string())
        );
        assert_eq!(normalize_endpoint("   "), None);
        assert_eq!(normalize_endpoint(""), None);
    }

    #[test]
    fn test_builder_methods_only_touch_s3() {
        let config = ObjectStoreConfig::s3("data", DEFAULT_REGION)
            .with_endpoint("https://minio.internal")
            .with_path_style(true);
        assert_eq!(
            config.backend,
            StorageBackend::S3 {
                region: "us-east-1".to_string(),
                endpoint: Some("https://minio.internal".to_string()),
                force_path_style: true,
            }
        );

        let local = ObjectStoreConfig::local("/srv/objects", "data")
            .with_endpoint("https://ignored")
            .with_path_style(true);
        assert_eq!(
            local.backend,
            StorageBackend::Local {
                path: "/srv/objects".to_string()
            }
        );
        assert_eq!(local.backend.name(), "local");
    }

    #[test]
    fn test_backend_from_json() {
        let backend: StorageBackend = serde_json::from_str(
            r#"{"type": "s3", "region": "eu-west-1", "endpoint": null}"#,
        )
        .unwrap();
        assert_eq!(
            backend,
            StorageBackend::S3 {
                region: "eu-west-1".to_string(),
                endpoint: None,
                force_path_style: false,
            }
        );
    }
}
