//! Backend selection and client construction.
//!
//! The backend for a bundle comes from its `fs.<scheme>.impl` property when
//! set, otherwise from the scheme itself. Schemes with no backend fail with
//! [`StorageError::UnsupportedScheme`].

use std::sync::Arc;

use object_store::RetryConfig;
use object_store::memory::InMemory;
use tracing::info;
use url::Url;

use super::ObjectStoreClient;
use crate::config::{SchemeConfiguration, backend_key};
use crate::error::StorageError;

/// Storage backend implementation.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum BackendKind {
    Local,
    Memory,
    S3,
    Gcs,
    Azure,
}

impl BackendKind {
    /// Parse a backend name as written in an `fs.<scheme>.impl` property.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "local" | "file" => Some(BackendKind::Local),
            "memory" => Some(BackendKind::Memory),
            "s3" | "s3a" => Some(BackendKind::S3),
            "gcs" | "gs" => Some(BackendKind::Gcs),
            "azure" | "az" | "abfs" | "abfss" => Some(BackendKind::Azure),
            _ => None,
        }
    }

    /// Backend implied by a locator scheme; bare paths are local.
    pub fn for_scheme(scheme: Option<&str>) -> Option<Self> {
        match scheme {
            None => Some(BackendKind::Local),
            Some(scheme) => Self::from_name(scheme),
        }
    }

    /// Backend for a configuration bundle.
    pub fn resolve(config: &SchemeConfiguration) -> Result<Self, StorageError> {
        let scheme = config.scheme();
        let configured = scheme.and_then(|s| config.get(&backend_key(s)));

        configured
            .and_then(Self::from_name)
            .or_else(|| Self::for_scheme(scheme))
            .ok_or_else(|| StorageError::UnsupportedScheme {
                scheme: scheme.unwrap_or_default().to_string(),
            })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::Memory => "memory",
            BackendKind::S3 => "s3",
            BackendKind::Gcs => "gcs",
            BackendKind::Azure => "azure",
        }
    }
}

/// The bundle's default endpoint as a URL, if it has one.
pub(super) fn endpoint_url(config: &SchemeConfiguration) -> Option<Url> {
    config.default_endpoint().and_then(|e| Url::parse(e).ok())
}

/// Host component of the default endpoint, when the bundle's own scheme is
/// one of `schemes`. For those schemes the host names the bucket or container.
pub(super) fn native_host(config: &SchemeConfiguration, schemes: &[&str]) -> Option<String> {
    let scheme = config.scheme()?;
    if !schemes.contains(&scheme) {
        return None;
    }
    endpoint_url(config)
        .and_then(|url| url.host_str().map(str::to_string))
        .filter(|host| !host.is_empty())
}

/// Retry policy for remote backends: none, so failures reach the caller as-is.
pub(super) fn no_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 0,
        ..RetryConfig::default()
    }
}

/// Build the storage client for a configuration bundle.
pub async fn build_client(config: &SchemeConfiguration) -> Result<ObjectStoreClient, StorageError> {
    let kind = BackendKind::resolve(config)?;

    let client = match kind {
        BackendKind::Local => ObjectStoreClient::construct_local(config).await?,
        BackendKind::Memory => ObjectStoreClient::new(Arc::new(InMemory::new()), "memory://"),
        BackendKind::S3 => ObjectStoreClient::construct_s3(config)?,
        BackendKind::Gcs => ObjectStoreClient::construct_gcs(config)?,
        BackendKind::Azure => ObjectStoreClient::construct_azure(config)?,
    };

    info!(
        backend = kind.as_str(),
        url = client.canonical_url(),
        "Constructed storage client"
    );
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ENDPOINT_KEY;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn bundle(scheme: Option<&str>, props: &[(&str, &str)]) -> SchemeConfiguration {
        let properties: BTreeMap<String, String> = props
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SchemeConfiguration::new(scheme.map(str::to_string), PathBuf::new(), properties)
    }

    #[test]
    fn test_kind_from_scheme() {
        assert_eq!(
            BackendKind::resolve(&bundle(None, &[])).unwrap(),
            BackendKind::Local
        );
        assert_eq!(
            BackendKind::resolve(&bundle(Some("file"), &[])).unwrap(),
            BackendKind::Local
        );
        assert_eq!(
            BackendKind::resolve(&bundle(Some("s3a"), &[])).unwrap(),
            BackendKind::S3
        );
        assert_eq!(
            BackendKind::resolve(&bundle(Some("gs"), &[])).unwrap(),
            BackendKind::Gcs
        );
        assert_eq!(
            BackendKind::resolve(&bundle(Some("abfss"), &[])).unwrap(),
            BackendKind::Azure
        );
    }

    #[test]
    fn test_kind_from_impl_property() {
        let config = bundle(Some("storage"), &[("fs.storage.impl", "memory")]);
        assert_eq!(BackendKind::resolve(&config).unwrap(), BackendKind::Memory);
    }

    #[test]
    fn test_unknown_scheme_is_unsupported() {
        let err = BackendKind::resolve(&bundle(Some("hdfs"), &[])).unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedScheme { scheme } if scheme == "hdfs"));

        let config = bundle(Some("storage"), &[("fs.storage.impl", "carrier-pigeon")]);
        assert!(BackendKind::resolve(&config).is_err());
    }

    #[test]
    fn test_native_host() {
        let config = bundle(Some("s3"), &[(DEFAULT_ENDPOINT_KEY, "s3://my-bucket")]);
        assert_eq!(native_host(&config, &["s3"]).as_deref(), Some("my-bucket"));
        assert_eq!(native_host(&config, &["gs"]), None);
    }

    #[tokio::test]
    async fn test_build_memory_client() {
        let config = bundle(Some("storage"), &[("fs.storage.impl", "memory")]);
        let client = build_client(&config).await.unwrap();
        assert_eq!(client.canonical_url(), "memory://");
    }

    #[test]
    fn test_remote_backends_do_not_retry() {
        assert_eq!(no_retry().max_retries, 0);
    }
}
