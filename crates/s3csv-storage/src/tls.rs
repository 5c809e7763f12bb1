//! TLS client configuration with a pluggable certificate hostname policy.
//!
//! Virtual-hosted S3 URLs put the bucket name in front of the regional
//! endpoint, e.g. `my.bucket.s3-eu-west-1.amazonaws.com`. AWS serves a
//! wildcard certificate for `*.s3-eu-west-1.amazonaws.com`, and a wildcard
//! only covers a single label, so dotted bucket names fail verification.
//! [`BucketCompaction`] folds the bucket labels together before the name is
//! matched against the certificate.
//!
//! The policy is injected into each [`ClientConfig`] built here. Nothing
//! process-wide is modified.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::SystemTime;

use rustls::client::{ServerCertVerified, ServerCertVerifier, WebPkiVerifier};
use rustls::{Certificate, ClientConfig, OwnedTrustAnchor, RootCertStore, ServerName};
use tracing::debug;

const AWS_DOMAIN_SUFFIX: &str = ".amazonaws.com";

/// Compact bucket labels of an AWS hostname.
///
/// For hosts ending in `.amazonaws.com`, every label before the last three
/// is concatenated without dots. Any other host is returned unchanged.
pub fn remove_dot(host: &str) -> String {
    if !host.ends_with(AWS_DOMAIN_SUFFIX) {
        return host.to_string();
    }

    let labels: Vec<&str> = host.split('.').collect();
    let (bucket, base) = labels.split_at(labels.len().saturating_sub(3));

    let mut compacted = bucket.concat();
    if !compacted.is_empty() {
        compacted.push('.');
    }
    compacted.push_str(&base.join("."));
    compacted
}

/// Decides which name a server certificate is matched against.
pub trait HostnamePolicy: Send + Sync + std::fmt::Debug {
    /// Map the requested DNS name to the name used for certificate matching.
    fn certificate_name<'a>(&self, host: &'a str) -> Cow<'a, str>;
}

/// Applies [`remove_dot`] to every DNS name.
#[derive(Debug, Default, Clone, Copy)]
pub struct BucketCompaction;

impl HostnamePolicy for BucketCompaction {
    fn certificate_name<'a>(&self, host: &'a str) -> Cow<'a, str> {
        let compacted = remove_dot(host);
        if compacted == host {
            Cow::Borrowed(host)
        } else {
            Cow::Owned(compacted)
        }
    }
}

/// Standard verification against the requested name.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactHostname;

impl HostnamePolicy for ExactHostname {
    fn certificate_name<'a>(&self, host: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(host)
    }
}

/// WebPKI certificate verifier that rewrites the server name first.
pub struct RewritingVerifier {
    inner: WebPkiVerifier,
    policy: Arc<dyn HostnamePolicy>,
}

impl RewritingVerifier {
    pub fn new(roots: RootCertStore, policy: Arc<dyn HostnamePolicy>) -> Self {
        Self {
            inner: WebPkiVerifier::new(roots, None),
            policy,
        }
    }

    /// Verifier trusting the Mozilla root program shipped in `webpki-roots`.
    pub fn with_webpki_roots(policy: Arc<dyn HostnamePolicy>) -> Self {
        Self::new(webpki_root_store(), policy)
    }

    /// Name the certificate must be valid for. IP addresses pass through.
    pub fn certificate_name(&self, server_name: &ServerName) -> Result<ServerName, rustls::Error> {
        match server_name {
            ServerName::DnsName(dns) => {
                let requested = dns.as_ref();
                let matched = self.policy.certificate_name(requested);
                if matched != requested {
                    debug!(requested, matched = %matched, "Rewrote certificate hostname");
                }
                ServerName::try_from(matched.as_ref()).map_err(|_| {
                    rustls::Error::General(format!("invalid certificate hostname: {}", matched))
                })
            }
            other => Ok(other.clone()),
        }
    }
}

impl std::fmt::Debug for RewritingVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewritingVerifier")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ServerCertVerifier for RewritingVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &Certificate,
        intermediates: &[Certificate],
        server_name: &ServerName,
        scts: &mut dyn Iterator<Item = &[u8]>,
        ocsp_response: &[u8],
        now: SystemTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let name = self.certificate_name(server_name)?;
        self.inner
            .verify_server_cert(end_entity, intermediates, &name, scts, ocsp_response, now)
    }
}

/// Root store populated from `webpki-roots`.
pub fn webpki_root_store() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    let anchors = webpki_roots::TLS_SERVER_ROOTS.iter().map(|ta| {
        OwnedTrustAnchor::from_subject_spki_name_constraints(
            ta.subject,
            ta.spki,
            ta.name_constraints,
        )
    });
    roots.add_trust_anchors(anchors);
    roots
}

/// Client configuration whose certificate checks go through `verifier`.
pub fn client_config(verifier: RewritingVerifier) -> ClientConfig {
    ClientConfig::builder()
        .with_safe_defaults()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_no_client_auth()
}
