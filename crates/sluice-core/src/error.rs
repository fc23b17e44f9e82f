//! Error types for the storage access layer.
//!
//! Configuration failures and storage failures are kept apart so callers can
//! tell a bad locator or config resource from an I/O problem on the storage
//! service. [`AccessError`] joins the two for operations that touch both.

use std::path::PathBuf;

use snafu::prelude::*;

// ============ Config Errors ============

/// Errors raised while resolving a scheme configuration bundle.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// The locator is not a syntactically valid URI.
    #[snafu(display("Invalid locator '{locator}': {source}"))]
    LocatorFormat {
        locator: String,
        source: url::ParseError,
    },

    /// The configuration resource exists but could not be read.
    #[snafu(display("Failed to read configuration resource {}: {source}", path.display()))]
    ConfigResource {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration resource is not valid YAML.
    #[snafu(display("Failed to parse configuration resource {}: {source}", path.display()))]
    YamlParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// A `${{...}}` reference in a property value could not be expanded.
    #[snafu(display("Variable expansion failed in {}:\n{message}", path.display()))]
    Expansion { path: PathBuf, message: String },
}

// ============ Storage Errors ============

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// Object store operation failed.
    #[snafu(display("Storage operation failed: {source}"))]
    ObjectStore { source: object_store::Error },

    /// IO error while reading from an opened object.
    #[snafu(display("IO error: {source}"))]
    Io { source: std::io::Error },

    /// No backend is registered for the scheme.
    #[snafu(display("No filesystem for scheme: {scheme}"))]
    UnsupportedScheme { scheme: String },

    /// Non-recursive delete of a directory that still has children.
    #[snafu(display("Directory is not empty: {path}"))]
    DirectoryNotEmpty { path: String },

    /// Glob pattern could not be compiled.
    #[snafu(display("Invalid glob pattern '{pattern}': {source}"))]
    InvalidPattern {
        pattern: String,
        source: glob::PatternError,
    },

    /// Backend builder rejected its configuration.
    #[snafu(display("{backend} configuration error: {source}"))]
    BackendBuild {
        backend: &'static str,
        source: object_store::Error,
    },

    /// A container header is missing or malformed.
    #[snafu(display("Invalid container header in {path}: {message}"))]
    InvalidHeader { path: String, message: String },
}

impl StorageError {
    /// Check if this error represents a "not found" condition.
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::ObjectStore { source } => {
                matches!(source, object_store::Error::NotFound { .. })
            }
            StorageError::Io { source } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(source: std::io::Error) -> Self {
        StorageError::Io { source }
    }
}

// ============ Access Errors ============

/// Errors returned when acquiring a filesystem handle.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum AccessError {
    /// Configuration could not be resolved.
    #[snafu(display("{source}"), context(false))]
    Config { source: ConfigError },

    /// The storage client could not be constructed.
    #[snafu(display("{source}"), context(false))]
    Storage { source: StorageError },

    /// Blocking configuration work panicked or was cancelled.
    #[snafu(display("Configuration task failed: {source}"))]
    TaskJoin { source: tokio::task::JoinError },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let err = StorageError::ObjectStore {
            source: object_store::Error::NotFound {
                path: "a/b".to_string(),
                source: "missing".into(),
            },
        };
        assert!(err.is_not_found());

        let err = StorageError::from(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(err.is_not_found());

        let err = StorageError::DirectoryNotEmpty {
            path: "a".to_string(),
        };
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_unsupported_scheme_message() {
        let err = StorageError::UnsupportedScheme {
            scheme: "hdfs".to_string(),
        };
        assert_eq!(err.to_string(), "No filesystem for scheme: hdfs");
    }
}
