//! Locator parsing.
//!
//! A locator is either an absolute URI (`storage://nodeA:9000/data/in`,
//! `file:///tmp/x`, `s3://bucket/key`) or a bare path (`/data/in`). Bare
//! paths carry no scheme and no endpoint.

use object_store::path::Path;
use snafu::prelude::*;
use url::Url;

use crate::error::{ConfigError, LocatorFormatSnafu};
use crate::storage::glob::has_wildcard;

/// A parsed locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    scheme: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    /// Slash-separated path, still percent-encoded when parsed from a URI.
    path: String,
}

impl Locator {
    /// Parse a locator string.
    ///
    /// Strings without a scheme are accepted as bare paths. Anything else must
    /// parse as a URI, otherwise [`ConfigError::LocatorFormat`] is returned.
    pub fn parse(locator: &str) -> Result<Self, ConfigError> {
        match Url::parse(locator) {
            Ok(url) => Ok(Self::from_url(&url)),
            Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Self {
                scheme: None,
                host: None,
                port: None,
                path: locator.to_string(),
            }),
            Err(source) => Err(source).context(LocatorFormatSnafu { locator }),
        }
    }

    fn from_url(url: &Url) -> Self {
        Self {
            scheme: Some(url.scheme().to_string()),
            host: url.host_str().map(str::to_string),
            port: url.port_or_known_default(),
            path: url.path().to_string(),
        }
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Convert the path component into a store-relative object path.
    pub fn object_path(&self) -> Result<Path, object_store::path::Error> {
        if self.scheme.is_some() {
            Path::from_url_path(&self.path)
        } else {
            Ok(Path::from(self.path.as_str()))
        }
    }

    /// Store-relative path text of `locator`, in the form glob patterns are
    /// expanded from.
    ///
    /// Unlike [`Locator::parse`] this never interprets `?` or `[` as URI
    /// syntax. Literal segments of a URI locator are percent-decoded the same
    /// way [`Locator::object_path`] decodes them; wildcard segments and bare
    /// paths are kept as written.
    pub fn raw_path(locator: &str) -> String {
        let Some((_, rest)) = locator.split_once("://") else {
            return locator.trim_matches('/').to_string();
        };
        let path = rest.find('/').map_or("", |slash| &rest[slash..]);

        path.trim_matches('/')
            .split('/')
            .map(|segment| match Path::from_url_path(segment) {
                Ok(decoded) if !has_wildcard(segment) => decoded.to_string(),
                _ => segment.to_string(),
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// The `scheme://host[:port]` endpoint of this locator, if it has a scheme.
    ///
    /// The port is omitted when the locator names none and the scheme has no
    /// well-known default.
    pub fn endpoint(&self) -> Option<String> {
        let scheme = self.scheme.as_deref()?;
        let host = self.host.as_deref().unwrap_or_default();
        Some(match self.port {
            Some(port) => format!("{scheme}://{host}:{port}"),
            None => format!("{scheme}://{host}"),
        })
    }
}
