//! Scheme configuration bundles and their process-wide cache.

mod cache;
mod expand;
mod loader;
mod locator;

pub use cache::ConfigCache;
pub use expand::{MAX_EXPANSION_DEPTH, expand_properties};
pub use loader::{load_properties, parse_properties};
pub use locator::Locator;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

/// Property holding the default-filesystem endpoint (`scheme://host:port`).
pub const DEFAULT_ENDPOINT_KEY: &str = "fs.default.name";

/// Property holding the opaque identity string passed to the storage client.
pub const IDENTITY_KEY: &str = "hadoop.job.ugi";

/// Property listing the enabled compression codecs.
pub const CODECS_KEY: &str = "io.compression.codecs";

/// File name of the default configuration resource under `<home>/config/`.
pub const DEFAULT_CONFIG_FILENAME: &str = "storage-site.yaml";

/// Key of the property selecting the backend for a scheme (`fs.<scheme>.impl`).
pub fn backend_key(scheme: &str) -> String {
    format!("fs.{scheme}.impl")
}

/// Configuration bundle for one storage-service scheme.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemeConfiguration {
    scheme: Option<String>,
    /// Resource the properties were loaded from.
    source: PathBuf,
    properties: BTreeMap<String, String>,
}

impl SchemeConfiguration {
    pub fn new(
        scheme: Option<String>,
        source: PathBuf,
        properties: BTreeMap<String, String>,
    ) -> Self {
        Self {
            scheme,
            source,
            properties,
        }
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn source(&self) -> &std::path::Path {
        &self.source
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// The default-filesystem endpoint, e.g. `storage://nodeA:9000`.
    pub fn default_endpoint(&self) -> Option<&str> {
        self.get(DEFAULT_ENDPOINT_KEY)
    }

    pub fn identity(&self) -> Option<&str> {
        self.get(IDENTITY_KEY)
    }

    /// Properties whose key starts with `prefix`, for handing to a backend builder.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.properties
            .iter()
            .filter(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let mut config = SchemeConfiguration::default();
        assert_eq!(config.default_endpoint(), None);

        config.set(DEFAULT_ENDPOINT_KEY, "storage://nodeA:9000");
        config.set(IDENTITY_KEY, "user1");
        config.set("aws_region", "us-east-1");
        config.set("aws_endpoint", "http://localhost:9000");

        assert_eq!(config.default_endpoint(), Some("storage://nodeA:9000"));
        assert_eq!(config.identity(), Some("user1"));
        assert_eq!(config.with_prefix("aws_").count(), 2);
    }

    #[test]
    fn test_backend_key() {
        assert_eq!(backend_key("storage"), "fs.storage.impl");
    }
}
