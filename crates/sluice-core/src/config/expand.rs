//! `${...}` expansion of property values.
//!
//! After a resource is flattened, each value may reference:
//! - `${some.key}` - another property of the same resource
//! - `${env.NAME}` - an environment variable
//! - `${env.NAME:-default}` - default when NAME is unset or empty
//! - `${env.NAME-default}` - default only when NAME is unset
//!
//! Property references expand recursively, up to [`MAX_EXPANSION_DEPTH`]
//! levels; a deeper chain (or a cycle) is an error. Environment values are
//! taken verbatim.

use std::collections::BTreeMap;
use std::env;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Maximum nesting of property references.
pub const MAX_EXPANSION_DEPTH: usize = 20;

static REFERENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \$\{
            (?:
                env\.([A-Za-z_][A-Za-z0-9_]*)  # environment variable (1)
                (?:(:?-)([^}]*))?              # default operator (2) and value (3)
            |
                ([^}$\s]+)                     # property key (4)
            )
        \}
        ",
    )
    .expect("Invalid regex pattern")
});

/// Expand every value of `properties`.
///
/// Returns the expanded map, or every failure message in key order.
pub fn expand_properties(
    properties: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>, Vec<String>> {
    let mut errors = Vec::new();
    let expanded = properties
        .iter()
        .map(|(key, value)| {
            let value = expand_value(key, value, properties, 0, &mut errors);
            (key.clone(), value)
        })
        .collect();

    if errors.is_empty() {
        Ok(expanded)
    } else {
        Err(errors)
    }
}

fn expand_value(
    key: &str,
    value: &str,
    properties: &BTreeMap<String, String>,
    depth: usize,
    errors: &mut Vec<String>,
) -> String {
    if depth > MAX_EXPANSION_DEPTH {
        errors.push(format!(
            "'{key}': references nest deeper than {MAX_EXPANSION_DEPTH} levels"
        ));
        return value.to_string();
    }

    REFERENCE_PATTERN
        .replace_all(value, |caps: &Captures| {
            let reference = &caps[0];

            if let Some(name) = caps.get(1).map(|m| m.as_str()) {
                let operator = caps.get(2).map(|m| m.as_str());
                let default = caps.get(3).map(|m| m.as_str());
                return match (env::var(name), default) {
                    (Ok(v), Some(default)) if v.is_empty() && operator == Some(":-") => {
                        default.to_string()
                    }
                    (Ok(v), _) => v,
                    (Err(_), Some(default)) => default.to_string(),
                    (Err(_), None) => {
                        errors.push(format!("'{key}': environment variable {name} is not set"));
                        reference.to_string()
                    }
                };
            }

            let target = &caps[4];
            match properties.get(target) {
                Some(nested) => expand_value(key, nested, properties, depth + 1, errors),
                None => {
                    errors.push(format!("'{key}': undefined property {target}"));
                    reference.to_string()
                }
            }
        })
        .into_owned()
}
