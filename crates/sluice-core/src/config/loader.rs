//! Property resource loading.
//!
//! A configuration resource is a YAML document whose nested mappings are
//! flattened into dotted keys:
//!
//! ```yaml
//! fs:
//!   default:
//!     name: storage://nodeA:9000
//! io.compression.codecs: [gzip, zstd]
//! ```
//!
//! yields `fs.default.name = storage://nodeA:9000` and
//! `io.compression.codecs = gzip,zstd`. Values are then expanded, see
//! [`super::expand_properties`].

use std::collections::BTreeMap;
use std::path::Path;

use serde_yaml::Value;
use snafu::prelude::*;

use crate::config::expand_properties;
use crate::error::{ConfigError, ConfigResourceSnafu, ExpansionSnafu, YamlParseSnafu};

/// Read and flatten a property resource from disk.
pub fn load_properties(path: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    let contents = std::fs::read_to_string(path).context(ConfigResourceSnafu { path })?;

    let properties = parse_properties(&contents).context(YamlParseSnafu { path })?;

    expand_properties(&properties).map_err(|errors| {
        ExpansionSnafu {
            path,
            message: errors.join("\n"),
        }
        .build()
    })
}

/// Parse and flatten a YAML property document.
pub fn parse_properties(contents: &str) -> Result<BTreeMap<String, String>, serde_yaml::Error> {
    let document: Value = serde_yaml::from_str(contents)?;
    let mut properties = BTreeMap::new();
    flatten(None, &document, &mut properties);
    Ok(properties)
}

fn flatten(prefix: Option<&str>, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Mapping(mapping) => {
            for (key, child) in mapping {
                let Some(key) = scalar_to_string(key) else {
                    continue;
                };
                let key = match prefix {
                    Some(prefix) => format!("{prefix}.{key}"),
                    None => key,
                };
                flatten(Some(&key), child, out);
            }
        }
        Value::Tagged(tagged) => flatten(prefix, &tagged.value, out),
        Value::Sequence(items) => {
            if let Some(prefix) = prefix {
                let joined = items
                    .iter()
                    .filter_map(scalar_to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                out.insert(prefix.to_string(), joined);
            }
        }
        scalar => {
            if let (Some(prefix), Some(value)) = (prefix, scalar_to_string(scalar)) {
                out.insert(prefix.to_string(), value);
            }
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_keys_are_flattened() {
        let props = parse_properties(
            r#"
fs:
  default:
    name: storage://nodeA:9000
  storage.impl: s3
hadoop.job.ugi: etl,supergroup
"#,
        )
        .unwrap();

        assert_eq!(props["fs.default.name"], "storage://nodeA:9000");
        assert_eq!(props["fs.storage.impl"], "s3");
        assert_eq!(props["hadoop.job.ugi"], "etl,supergroup");
    }

    #[test]
    fn test_scalars_and_sequences() {
        let props = parse_properties(
            r#"
io.compression.codecs: [gzip, zstd]
dfs.replication: 3
dfs.permissions: false
empty:
"#,
        )
        .unwrap();

        assert_eq!(props["io.compression.codecs"], "gzip,zstd");
        assert_eq!(props["dfs.replication"], "3");
        assert_eq!(props["dfs.permissions"], "false");
        assert_eq!(props["empty"], "");
    }

    #[test]
    fn test_empty_document() {
        assert!(parse_properties("").unwrap().is_empty());
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = load_properties(Path::new("/nonexistent/storage-site.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigResource { .. }));
    }

    #[test]
    fn test_load_expands_references() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("storage-site.yaml");
        std::fs::write(
            &path,
            "cluster:\n  host: nodeA\nfs:\n  default:\n    name: storage://${cluster.host}:9000\n",
        )
        .unwrap();

        let props = load_properties(&path).unwrap();
        assert_eq!(props["fs.default.name"], "storage://nodeA:9000");
    }

    #[test]
    fn test_load_reports_unresolved_reference() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("storage-site.yaml");
        std::fs::write(&path, "fs.default.name: ${cluster.host}\n").unwrap();

        let err = load_properties(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Expansion { ref message, .. } if message.contains("cluster.host")));
    }

    #[test]
    fn test_load_reports_bad_yaml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("storage-site.yaml");
        std::fs::write(&path, "fs: [unterminated").unwrap();

        let err = load_properties(&path).unwrap_err();
        assert!(matches!(err, ConfigError::YamlParse { .. }));
    }
}
