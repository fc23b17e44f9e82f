//! Listing and batch deletion under a path.
//!
//! Listing is best-effort: [`list_entries`] logs a failure and returns no
//! entries. [`delete_entries`] deletes every matched entry independently and
//! reports one outcome per entry, so the caller decides whether a partial
//! failure matters.

use object_store::path::Path;
use tracing::{debug, warn};

use crate::emit;
use crate::error::StorageError;
use crate::metrics::events::{EntriesListed, EntryDeleteFailed};
use crate::storage::{EntryStatus, StorageClient};

/// Entries matching `pattern`, propagating storage failures.
///
/// With `use_glob` the pattern is expanded as a glob; otherwise it names a
/// directory whose immediate children are returned. A path that matches
/// nothing yields an empty list.
pub async fn try_list_entries<C>(
    client: &C,
    pattern: &str,
    use_glob: bool,
) -> Result<Vec<EntryStatus>, StorageError>
where
    C: StorageClient + ?Sized,
{
    let entries = if use_glob {
        client.glob(pattern).await?
    } else {
        client.list(&Path::from(pattern)).await?
    };

    emit!(EntriesListed {
        count: entries.len(),
        glob: use_glob,
    });
    Ok(entries)
}

/// Entries matching `pattern`; a storage failure is logged and yields none.
pub async fn list_entries<C>(client: &C, pattern: &str, use_glob: bool) -> Vec<EntryStatus>
where
    C: StorageClient + ?Sized,
{
    match try_list_entries(client, pattern, use_glob).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(pattern, use_glob, error = %e, "Failed to list entries");
            Vec::new()
        }
    }
}

/// Result of deleting one entry.
#[derive(Debug)]
pub enum DeleteOutcome {
    Deleted,
    /// The entry vanished between listing and deletion.
    NotFound,
    Failed(StorageError),
}

/// Per-entry results of [`delete_entries`].
#[derive(Debug, Default)]
pub struct DeleteReport {
    pub outcomes: Vec<(Path, DeleteOutcome)>,
    /// Set when the entries could not be listed at all.
    pub listing_error: Option<StorageError>,
}

impl DeleteReport {
    pub fn deleted(&self) -> impl Iterator<Item = &Path> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, DeleteOutcome::Deleted))
            .map(|(path, _)| path)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Path, &StorageError)> {
        self.outcomes.iter().filter_map(|(path, outcome)| match outcome {
            DeleteOutcome::Failed(e) => Some((path, e)),
            _ => None,
        })
    }

    /// True when listing succeeded and no entry failed to delete.
    pub fn is_success(&self) -> bool {
        self.listing_error.is_none() && self.failures().next().is_none()
    }
}

/// Delete every entry matching `pattern`.
///
/// `recursive` allows non-empty directories to be removed. A failure on one
/// entry is logged and recorded, and deletion continues with the next one.
pub async fn delete_entries<C>(
    client: &C,
    pattern: &str,
    recursive: bool,
    use_glob: bool,
) -> DeleteReport
where
    C: StorageClient + ?Sized,
{
    let entries = match try_list_entries(client, pattern, use_glob).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(pattern, use_glob, error = %e, "Failed to list entries for deletion");
            return DeleteReport {
                outcomes: Vec::new(),
                listing_error: Some(e),
            };
        }
    };

    let mut report = DeleteReport::default();
    for entry in entries {
        let outcome = match client.delete(&entry.path, recursive).await {
            Ok(true) => {
                debug!(path = %entry.path, "Deleted entry");
                DeleteOutcome::Deleted
            }
            Ok(false) => DeleteOutcome::NotFound,
            Err(e) => {
                warn!(path = %entry.path, recursive, error = %e, "Failed to delete entry");
                emit!(EntryDeleteFailed);
                DeleteOutcome::Failed(e)
            }
        };
        report.outcomes.push((entry.path, outcome));
    }
    report
}
