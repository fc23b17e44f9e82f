//! Per-scheme configuration cache.
//!
//! The first resolution for a scheme builds the bundle and pins it; every later
//! resolution for that scheme returns the pinned bundle, whatever identity or
//! configuration path it supplies.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::info;

use super::{
    DEFAULT_CONFIG_FILENAME, DEFAULT_ENDPOINT_KEY, IDENTITY_KEY, Locator, SchemeConfiguration,
    load_properties,
};
use crate::error::ConfigError;

/// Cache of configuration bundles keyed by locator scheme.
///
/// Bare-path locators share the entry keyed by `None`.
#[derive(Debug)]
pub struct ConfigCache {
    home: Option<PathBuf>,
    bundles: DashMap<Option<String>, Arc<SchemeConfiguration>>,
}

impl Default for ConfigCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigCache {
    /// Create a cache whose default resource lives under the user's home directory.
    pub fn new() -> Self {
        Self {
            home: dirs::home_dir(),
            bundles: DashMap::new(),
        }
    }

    /// Create a cache whose default resource lives under `home`.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            home: Some(home.into()),
            bundles: DashMap::new(),
        }
    }

    /// Path of the fallback resource, `<home>/config/storage-site.yaml`.
    pub fn default_resource(&self) -> PathBuf {
        self.home
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config")
            .join(DEFAULT_CONFIG_FILENAME)
    }

    /// Resolve the configuration bundle for `locator`'s scheme.
    ///
    /// `identity` and `config_path` only take effect on the call that builds
    /// the bundle. The shard holding the scheme stays locked while the bundle
    /// is built, so racing first callers build it once.
    pub fn resolve(
        &self,
        locator: &str,
        identity: Option<&str>,
        config_path: Option<&str>,
    ) -> Result<Arc<SchemeConfiguration>, ConfigError> {
        let locator = Locator::parse(locator)?;
        let scheme = locator.scheme().map(str::to_string);

        if let Some(bundle) = self.bundles.get(&scheme) {
            return Ok(bundle.clone());
        }

        match self.bundles.entry(scheme) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let bundle = Arc::new(self.build(&locator, identity, config_path)?);
                entry.insert(bundle.clone());
                Ok(bundle)
            }
        }
    }

    /// Look up an already-resolved bundle without building one.
    pub fn get(&self, scheme: Option<&str>) -> Option<Arc<SchemeConfiguration>> {
        self.bundles
            .get(&scheme.map(str::to_string))
            .map(|bundle| bundle.clone())
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    fn build(
        &self,
        locator: &Locator,
        identity: Option<&str>,
        config_path: Option<&str>,
    ) -> Result<SchemeConfiguration, ConfigError> {
        let source = match config_path.map(str::trim) {
            Some(path) if !path.is_empty() && Path::new(path).is_file() => PathBuf::from(path),
            _ => self.default_resource(),
        };

        // A missing fallback resource is not an error; the bundle just starts empty.
        let properties = if source.exists() {
            load_properties(&source)?
        } else {
            Default::default()
        };

        let mut bundle =
            SchemeConfiguration::new(locator.scheme().map(str::to_string), source, properties);

        info!(
            source = %bundle.source().display(),
            "Using storage configuration resource"
        );
        info!(
            identity = bundle.identity().unwrap_or_default(),
            "Default storage identity"
        );

        if let Some(endpoint) = locator.endpoint() {
            info!("{DEFAULT_ENDPOINT_KEY}={endpoint}");
            bundle.set(DEFAULT_ENDPOINT_KEY, endpoint);
        }

        if let Some(identity) = identity {
            bundle.set(IDENTITY_KEY, identity);
            info!(identity, "Using supplied storage identity");
        }

        Ok(bundle)
    }
}
