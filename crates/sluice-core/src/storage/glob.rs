//! Glob expansion over a [`StorageClient`].
//!
//! Patterns are expanded one path segment at a time. Literal segments are
//! appended to every candidate without touching storage; a wildcard segment
//! lists the children of every candidate and keeps the ones whose name
//! matches. Candidates reached only through literal segments are checked for
//! existence at the end.
//!
//! Supported wildcards are `*`, `?`, `[abc]`, `[a-z]` and `[!abc]`, always
//! confined to a single segment.

use glob::Pattern;
use object_store::path::Path;
use snafu::prelude::*;

use super::{EntryStatus, StorageClient};
use crate::error::{InvalidPatternSnafu, StorageError};

/// True if `segment` contains a glob metacharacter.
pub fn has_wildcard(segment: &str) -> bool {
    segment.contains(['*', '?', '['])
}

/// True if any segment of `pattern` is a glob.
pub fn is_glob(pattern: &str) -> bool {
    pattern.split('/').any(has_wildcard)
}

struct Candidate {
    path: Path,
    status: Option<EntryStatus>,
}

/// Expand `pattern` against `client`, returning matching entries sorted by path.
///
/// A pattern that matches nothing yields an empty list.
pub async fn expand<C>(client: &C, pattern: &str) -> Result<Vec<EntryStatus>, StorageError>
where
    C: StorageClient + ?Sized,
{
    let segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();

    let mut candidates = vec![Candidate {
        path: Path::default(),
        status: None,
    }];

    for (index, segment) in segments.iter().enumerate() {
        if !has_wildcard(segment) {
            for candidate in &mut candidates {
                candidate.path = candidate.path.child(*segment);
                candidate.status = None;
            }
            continue;
        }

        let matcher = Pattern::new(segment).context(InvalidPatternSnafu { pattern })?;
        let is_last = index + 1 == segments.len();
        let mut next = Vec::new();

        for candidate in candidates {
            let children = match client.list(&candidate.path).await {
                Ok(children) => children,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            };

            for child in children {
                // A file path lists as itself and has no children to match.
                if child.path == candidate.path || (!is_last && !child.is_dir) {
                    continue;
                }
                let matches = child
                    .path
                    .filename()
                    .is_some_and(|name| matcher.matches(name));
                if matches {
                    next.push(Candidate {
                        path: child.path.clone(),
                        status: Some(child),
                    });
                }
            }
        }

        candidates = next;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
    }

    let mut matched = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match candidate.status {
            Some(status) => matched.push(status),
            None => {
                if let Some(status) = client.status(&candidate.path).await? {
                    matched.push(status);
                }
            }
        }
    }

    matched.sort_by(|a, b| a.path.cmp(&b.path));
    matched.dedup_by(|a, b| a.path == b.path);
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ObjectStoreClient;

    async fn seeded_client(paths: &[&str]) -> ObjectStoreClient {
        let client = ObjectStoreClient::in_memory();
        for path in paths {
            client.put(&Path::from(*path), b"x".to_vec()).await.unwrap();
        }
        client
    }

    fn names(entries: &[EntryStatus]) -> Vec<String> {
        entries.iter().map(|e| e.path.to_string()).collect()
    }

    #[test]
    fn test_wildcard_detection() {
        assert!(is_glob("dir/part-*"));
        assert!(is_glob("dir/part-?"));
        assert!(is_glob("dir/[ab]/x"));
        assert!(!is_glob("dir/part-0"));
    }

    #[tokio::test]
    async fn test_trailing_wildcard() {
        let client = seeded_client(&[
            "dir/part-0000",
            "dir/part-0001",
            "dir/_SUCCESS",
            "dir/sub/part-9999",
        ])
        .await;

        let matched = expand(&client, "dir/part-*").await.unwrap();
        assert_eq!(names(&matched), vec!["dir/part-0000", "dir/part-0001"]);
        assert!(matched.iter().all(|e| !e.is_dir));
    }

    #[tokio::test]
    async fn test_wildcard_directory_then_literal() {
        let client = seeded_client(&[
            "logs/2024-01-01/data.gz",
            "logs/2024-01-02/data.gz",
            "logs/2024-01-02/other.gz",
            "logs/2024-02-01/data.gz",
        ])
        .await;

        let matched = expand(&client, "logs/2024-01-??/data.gz").await.unwrap();
        assert_eq!(
            names(&matched),
            vec!["logs/2024-01-01/data.gz", "logs/2024-01-02/data.gz"]
        );
    }

    #[tokio::test]
    async fn test_bracket_classes() {
        let client = seeded_client(&["t/a1", "t/b1", "t/c1"]).await;

        let matched = expand(&client, "t/[ab]1").await.unwrap();
        assert_eq!(names(&matched), vec!["t/a1", "t/b1"]);

        let matched = expand(&client, "t/[!ab]1").await.unwrap();
        assert_eq!(names(&matched), vec!["t/c1"]);
    }

    #[tokio::test]
    async fn test_wildcard_matches_directories() {
        let client = seeded_client(&["root/d1/f", "root/d2/f", "root/f3"]).await;

        let matched = expand(&client, "root/d*").await.unwrap();
        assert_eq!(names(&matched), vec!["root/d1", "root/d2"]);
        assert!(matched.iter().all(|e| e.is_dir));
    }

    #[tokio::test]
    async fn test_no_match_is_empty() {
        let client = seeded_client(&["dir/a"]).await;

        assert!(expand(&client, "dir/zz*").await.unwrap().is_empty());
        assert!(expand(&client, "missing/*").await.unwrap().is_empty());
        assert!(expand(&client, "dir/nothing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_literal_pattern_resolves_existing_entry() {
        let client = seeded_client(&["dir/a"]).await;

        let matched = expand(&client, "dir/a").await.unwrap();
        assert_eq!(matched, vec![EntryStatus::file(Path::from("dir/a"), 1)]);
    }

    #[tokio::test]
    async fn test_invalid_pattern() {
        let client = seeded_client(&["dir/a"]).await;

        let err = expand(&client, "dir/[a").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidPattern { .. }));
    }
}
