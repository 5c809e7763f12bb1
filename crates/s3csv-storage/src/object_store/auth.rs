//! Authentication configuration for storage backends.

use serde::{Deserialize, Serialize};

/// Authentication configuration for different backends
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthConfig {
    /// No authentication required (local storage)
    #[default]
    None,

    /// S3 authentication
    S3(S3Credentials),
}

/// S3 authentication methods
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum S3Credentials {
    /// Use explicit access key credentials
    AccessKey {
        access_key_id: String,
        secret_access_key: String,
        session_token: Option<String>,
    },
}

impl S3Credentials {
    /// Static access key credentials without a session token.
    pub fn access_key(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        S3Credentials::AccessKey {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    /// Convert into the SDK credential type.
    pub(crate) fn to_sdk_credentials(&self) -> aws_credential_types::Credentials {
        match self {
            S3Credentials::AccessKey {
                access_key_id,
                secret_access_key,
                session_token,
            } => aws_credential_types::Credentials::new(
                access_key_id,
                secret_access_key,
                session_token.clone(),
                None,
                "s3csv-options",
            ),
        }
    }
}

impl std::fmt::Debug for S3Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            S3Credentials::AccessKey {
                access_key_id,
                session_token,
                ..
            } => f
                .debug_struct("AccessKey")
                .field("access_key_id", access_key_id)
                .field("secret_access_key", &"** redacted **")
                .field("session_token", &session_token.as_ref().map(|_| "** redacted **"))
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secret() {
        let creds = S3Credentials::access_key("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG");
        let printed = format!("{:?}", AuthConfig::S3(creds));
        assert!(printed.contains("AKIDEXAMPLE"));
        assert!(!printed.contains("wJalrXUtnFEMI"));
    }

    #[test]
    fn test_sdk_credentials_carry_keys() {
        let creds = S3Credentials::access_key("AKIDEXAMPLE", "secret");
        let sdk = creds.to_sdk_credentials();
        assert_eq!(sdk.access_key_id(), "AKIDEXAMPLE");
        assert_eq!(sdk.secret_access_key(), "secret");
        assert!(sdk.session_token().is_none());
    }
}
