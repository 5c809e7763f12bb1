//! AWS S3 and S3-compatible storage backend implementation.
//!
//! The public surface is blocking. Each [`ObjectStore::open_read`] call
//! builds a single-threaded Tokio runtime and a fresh SDK client, sends
//! `GetObject`, and hands back a reader that owns the runtime and pulls
//! body chunks only when the caller asks for more bytes.

use std::io::{self, Read};
use std::pin::Pin;
use std::sync::Arc;

use aws_config::{retry::RetryConfig, BehaviorVersion, Region};
use aws_sdk_s3::{
    config::Builder as S3ConfigBuilder,
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    operation::get_object::GetObjectError,
    Client as S3Client,
};
use aws_smithy_runtime::client::http::hyper_014::HyperClientBuilder;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::runtime::Runtime;
use tracing::{debug, info, instrument};

use crate::object_store::{
    auth::{AuthConfig, S3Credentials},
    config::{ObjectStoreConfig, StorageBackend},
    errors::{ObjectStoreError, ObjectStoreResult},
    storage::{ObjectReader, ObjectStore},
};
use crate::tls::{self, BucketCompaction, HostnamePolicy, RewritingVerifier};

/// AWS S3 backend implementation
pub struct S3Backend {
    bucket: String,
    region: String,
    endpoint: Option<String>,
    force_path_style: bool,
    credentials: Option<S3Credentials>,
    hostname_policy: Arc<dyn HostnamePolicy>,
}

impl S3Backend {
    /// Create a new S3 backend. Does not contact the endpoint.
    pub fn new(config: ObjectStoreConfig) -> ObjectStoreResult<Self> {
        let (region, endpoint, force_path_style) = match config.backend {
            StorageBackend::S3 {
                region,
                endpoint,
                force_path_style,
            } => (region, endpoint, force_path_style),
            _ => {
                return Err(ObjectStoreError::InvalidConfiguration {
                    message: "Expected S3 backend configuration".to_string(),
                })
            }
        };

        let credentials = match config.auth {
            AuthConfig::S3(creds) => Some(creds),
            AuthConfig::None => None,
        };

        debug!(
            "Created S3 backend for bucket '{}' in region '{}' (endpoint: {})",
            config.bucket,
            region,
            endpoint.as_deref().unwrap_or("aws default")
        );

        Ok(Self {
            bucket: config.bucket,
            region,
            endpoint,
            force_path_style,
            credentials,
            hostname_policy: Arc::new(BucketCompaction),
        })
    }

    /// Replace the certificate hostname policy used by clients of this backend.
    pub fn with_hostname_policy(mut self, policy: Arc<dyn HostnamePolicy>) -> Self {
        self.hostname_policy = policy;
        self
    }

    /// Policy that decides which name a server certificate must match.
    pub fn hostname_policy(&self) -> &dyn HostnamePolicy {
        self.hostname_policy.as_ref()
    }

    /// Certificate verifier installed in every client this backend builds.
    fn certificate_verifier(&self) -> RewritingVerifier {
        RewritingVerifier::with_webpki_roots(Arc::clone(&self.hostname_policy))
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    fn build_runtime() -> ObjectStoreResult<Runtime> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ObjectStoreError::Io)
    }

    /// Build an SDK client. Must run inside the per-read runtime.
    async fn build_client(&self) -> S3Client {
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls::client_config(self.certificate_verifier()))
            .https_or_http()
            .enable_http1()
            .build();
        let http_client = HyperClientBuilder::new().build(https);

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .http_client(http_client)
            .retry_config(RetryConfig::disabled());

        if let Some(creds) = &self.credentials {
            loader = loader.credentials_provider(creds.to_sdk_credentials());
        }

        let sdk_config = loader.load().await;
        let mut builder = S3ConfigBuilder::from(&sdk_config);

        if let Some(endpoint_url) = &self.endpoint {
            builder = builder.endpoint_url(endpoint_url);
        }

        if self.force_path_style {
            builder = builder.force_path_style(true);
        }

        S3Client::from_conf(builder.build())
    }

    /// Convert a `GetObject` failure into an [`ObjectStoreError`].
    fn convert_error(&self, err: SdkError<GetObjectError>, key: &str) -> ObjectStoreError {
        let message = DisplayErrorContext(&err).to_string();

        match &err {
            SdkError::ServiceError(context) => {
                let service_err = context.err();
                if service_err.is_no_such_key() {
                    return ObjectStoreError::NotFound {
                        key: key.to_string(),
                    };
                }
                match service_err.code() {
                    Some("NoSuchBucket") => ObjectStoreError::NotFound {
                        key: format!("{}/{}", self.bucket, key),
                    },
                    Some("AccessDenied") | Some("InvalidAccessKeyId")
                    | Some("SignatureDoesNotMatch") => ObjectStoreError::AccessDenied { message },
                    _ if context.raw().status().as_u16() == 403 => {
                        ObjectStoreError::AccessDenied { message }
                    }
                    _ if context.raw().status().as_u16() == 404 => ObjectStoreError::NotFound {
                        key: key.to_string(),
                    },
                    _ => ObjectStoreError::Aws(message),
                }
            }
            SdkError::DispatchFailure(_) => ObjectStoreError::NetworkError { message },
            SdkError::TimeoutError(_) => ObjectStoreError::Timeout {
                operation: format!("GetObject {}", key),
            },
            _ => ObjectStoreError::Aws(message),
        }
    }
}

impl std::fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Backend")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("force_path_style", &self.force_path_style)
            .field("credentials", &self.credentials)
            .field("hostname_policy", &self.hostname_policy)
            .finish()
    }
}

impl ObjectStore for S3Backend {
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    fn open_read(&self, key: &str) -> ObjectStoreResult<ObjectReader> {
        let runtime = Self::build_runtime()?;

        let response = runtime.block_on(async {
            let client = self.build_client().await;
            client
                .get_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| self.convert_error(e, key))
        })?;

        info!(
            content_length = ?response.content_length,
            "Opened S3 object: {}",
            key
        );

        Ok(Box::new(S3ObjectReader {
            body: Some(Box::pin(response.body.into_async_read())),
            runtime,
            key: key.to_string(),
            bytes_read: 0,
        }))
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}

/// Blocking reader over a `GetObject` body.
struct S3ObjectReader {
    body: Option<Pin<Box<dyn AsyncRead + Send>>>,
    runtime: Runtime,
    key: String,
    bytes_read: u64,
}

impl Read for S3ObjectReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let body = match self.body.as_mut() {
            Some(body) => body,
            None => return Ok(0),
        };

        let n = self.runtime.block_on(body.read(buf))?;
        self.bytes_read += n as u64;
        Ok(n)
    }
}

impl Drop for S3ObjectReader {
    fn drop(&mut self) {
        // Release the body while the runtime that owns its connection is still alive.
        let _guard = self.runtime.enter();
        self.body.take();
        debug!(bytes_read = self.bytes_read, "Closed S3 object: {}", self.key);
    }
}
