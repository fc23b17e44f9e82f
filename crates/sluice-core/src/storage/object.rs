//! [`StorageClient`] implementation over an `object_store` backend.
//!
//! Object stores are flat, so directories are derived from key prefixes: a
//! path is a directory when at least one object lives below it. On the local
//! filesystem a directory can also exist with nothing below it; such empty
//! directories are found and removed through the filesystem directly.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use object_store::buffered::BufReader;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ListResult, ObjectMeta, ObjectStore, PutPayload};
use snafu::prelude::*;
use tracing::debug;

use super::{EntryStatus, OpenedObject, StorageClient};
use crate::emit;
use crate::error::{DirectoryNotEmptySnafu, ObjectStoreSnafu, StorageError};
use crate::metrics::events::{
    RequestStatus, StorageOperation, StorageRequest, StorageRequestDuration,
};

/// Storage client backed by an `object_store` implementation.
#[derive(Clone)]
pub struct ObjectStoreClient {
    store: Arc<dyn ObjectStore>,
    /// Human-readable description of the backend, e.g. `s3://bucket`.
    canonical_url: String,
    /// Filesystem directory the namespace is rooted at, for local backends.
    local_root: Option<PathBuf>,
}

impl std::fmt::Debug for ObjectStoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectStoreClient<{}>", self.canonical_url)
    }
}

/// Run a store request, recording its outcome and duration.
async fn observed<T>(
    operation: StorageOperation,
    request: impl Future<Output = object_store::Result<T>>,
) -> object_store::Result<T> {
    let start = Instant::now();
    let result = request.await;
    emit!(StorageRequest {
        operation,
        status: RequestStatus::of(&result),
    });
    emit!(StorageRequestDuration {
        operation,
        duration: start.elapsed(),
    });
    result
}

/// The empty path addresses the namespace root, which object stores spell `None`.
fn prefix(path: &Path) -> Option<&Path> {
    (!path.as_ref().is_empty()).then_some(path)
}

impl ObjectStoreClient {
    pub fn new(store: Arc<dyn ObjectStore>, canonical_url: impl Into<String>) -> Self {
        Self {
            store,
            canonical_url: canonical_url.into(),
            local_root: None,
        }
    }

    /// Mark this client as backed by the local filesystem under `root`.
    pub fn with_local_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.local_root = Some(root.into());
        self
    }

    /// A client over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()), "memory://")
    }

    pub fn canonical_url(&self) -> &str {
        &self.canonical_url
    }

    pub fn object_store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Write `bytes` to `path`, replacing any existing object.
    pub async fn put(&self, path: &Path, bytes: Vec<u8>) -> Result<(), StorageError> {
        let payload = PutPayload::from(Bytes::from(bytes));
        observed(StorageOperation::Put, self.store.put(path, payload))
            .await
            .context(ObjectStoreSnafu)?;
        Ok(())
    }

    async fn head(&self, path: &Path) -> Result<Option<ObjectMeta>, StorageError> {
        if prefix(path).is_none() {
            return Ok(None);
        }
        match observed(StorageOperation::Head, self.store.head(path)).await {
            Ok(meta) => Ok(Some(meta)),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(source) => Err(StorageError::ObjectStore { source }),
        }
    }

    /// Filesystem directory at `path`, if this is a local client and one exists.
    async fn local_dir(&self, path: &Path) -> Result<Option<PathBuf>, StorageError> {
        let (Some(root), Some(path)) = (&self.local_root, prefix(path)) else {
            return Ok(None);
        };
        let dir = root.join(path.as_ref());
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(Some(dir)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a local directory that holds no objects.
    async fn remove_local_dir(
        &self,
        path: &Path,
        dir: &std::path::Path,
        recursive: bool,
    ) -> Result<(), StorageError> {
        let removed = if recursive {
            tokio::fs::remove_dir_all(dir).await
        } else {
            tokio::fs::remove_dir(dir).await
        };
        match removed {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::DirectoryNotEmpty => {
                DirectoryNotEmptySnafu {
                    path: path.to_string(),
                }
                .fail()
            }
            Err(e) => Err(e.into()),
        }
    }

    /// True if at least one object lives below `path`.
    async fn has_children(&self, path: &Path) -> Result<bool, StorageError> {
        let mut objects = self.store.list(prefix(path));
        let first = observed(StorageOperation::List, objects.try_next())
            .await
            .context(ObjectStoreSnafu)?;
        Ok(first.is_some())
    }
}

#[async_trait]
impl StorageClient for ObjectStoreClient {
    async fn open(&self, path: &Path) -> Result<OpenedObject, StorageError> {
        let meta = observed(StorageOperation::Head, self.store.head(path))
            .await
            .context(ObjectStoreSnafu)?;
        let size = meta.size;
        let reader = BufReader::new(self.store.clone(), &meta);
        debug!(path = %path, size, "Opened object");
        Ok(OpenedObject::new(path.clone(), size, Box::pin(reader)))
    }

    async fn status(&self, path: &Path) -> Result<Option<EntryStatus>, StorageError> {
        if prefix(path).is_none() {
            return Ok(Some(EntryStatus::dir(Path::default())));
        }
        if let Some(meta) = self.head(path).await? {
            return Ok(Some(EntryStatus::file(meta.location, meta.size)));
        }
        if self.has_children(path).await? || self.local_dir(path).await?.is_some() {
            return Ok(Some(EntryStatus::dir(path.clone())));
        }
        Ok(None)
    }

    async fn list(&self, path: &Path) -> Result<Vec<EntryStatus>, StorageError> {
        let listing = match observed(
            StorageOperation::List,
            self.store.list_with_delimiter(prefix(path)),
        )
        .await
        {
            Ok(listing) => listing,
            Err(object_store::Error::NotFound { .. }) => ListResult {
                common_prefixes: Vec::new(),
                objects: Vec::new(),
            },
            Err(source) => return Err(StorageError::ObjectStore { source }),
        };

        let mut entries: Vec<EntryStatus> = listing
            .common_prefixes
            .into_iter()
            .map(EntryStatus::dir)
            .chain(
                listing
                    .objects
                    .into_iter()
                    .map(|meta| EntryStatus::file(meta.location, meta.size)),
            )
            .collect();

        if entries.is_empty()
            && let Some(meta) = self.head(path).await?
        {
            entries.push(EntryStatus::file(meta.location, meta.size));
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn delete(&self, path: &Path, recursive: bool) -> Result<bool, StorageError> {
        if self.head(path).await?.is_some() {
            observed(StorageOperation::Delete, self.store.delete(path))
                .await
                .context(ObjectStoreSnafu)?;
            return Ok(true);
        }

        let children: Vec<Path> = observed(
            StorageOperation::List,
            self.store
                .list(prefix(path))
                .map_ok(|meta| meta.location)
                .try_collect(),
        )
        .await
        .context(ObjectStoreSnafu)?;

        if children.is_empty() {
            let Some(dir) = self.local_dir(path).await? else {
                return Ok(false);
            };
            self.remove_local_dir(path, &dir, recursive).await?;
            debug!(path = %path, "Deleted empty directory");
            return Ok(true);
        }

        ensure!(
            recursive,
            DirectoryNotEmptySnafu {
                path: path.to_string()
            }
        );

        let count = children.len();
        let locations = futures::stream::iter(children)
            .map(Ok::<_, object_store::Error>)
            .boxed();
        observed(
            StorageOperation::Delete,
            self.store.delete_stream(locations).try_collect::<Vec<_>>(),
        )
        .await
        .context(ObjectStoreSnafu)?;

        // Empty subdirectories hold no objects and survive the delete above.
        if let Some(dir) = self.local_dir(path).await? {
            self.remove_local_dir(path, &dir, true).await?;
        }

        debug!(path = %path, count, "Deleted directory recursively");
        Ok(true)
    }
}
