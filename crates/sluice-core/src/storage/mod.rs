//! Storage client abstraction.
//!
//! [`StorageClient`] is the capability set everything above this module relies
//! on: open a readable, seekable object; stat a path; list immediate children;
//! expand a glob; delete. [`ObjectStoreClient`] implements it over any
//! `object_store` backend, and [`build_client`] picks the backend for a
//! configuration bundle.

mod azure;
mod backend;
mod gcs;
pub mod glob;
mod local;
mod object;
mod s3;

pub use backend::{BackendKind, build_client};
pub use object::ObjectStoreClient;

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use object_store::path::Path;
use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};
use tracing::trace;

use crate::error::StorageError;

/// Status of a single entry in the storage namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryStatus {
    pub path: Path,
    /// Object size in bytes; zero for directories.
    pub size: u64,
    pub is_dir: bool,
}

impl EntryStatus {
    pub fn file(path: Path, size: u64) -> Self {
        Self {
            path,
            size,
            is_dir: false,
        }
    }

    pub fn dir(path: Path) -> Self {
        Self {
            path,
            size: 0,
            is_dir: true,
        }
    }
}

/// Byte source returned by [`StorageClient::open`].
pub trait ObjectRead: AsyncRead + AsyncSeek + Send {}

impl<T: AsyncRead + AsyncSeek + Send + ?Sized> ObjectRead for T {}

/// An object opened for reading.
///
/// The underlying reader is released when this value is dropped.
pub struct OpenedObject {
    path: Path,
    size: u64,
    reader: Pin<Box<dyn ObjectRead>>,
}

impl OpenedObject {
    pub fn new(path: Path, size: u64, reader: Pin<Box<dyn ObjectRead>>) -> Self {
        Self { path, size, reader }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// True when the object holds no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

impl std::fmt::Debug for OpenedObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedObject")
            .field("path", &self.path)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl Drop for OpenedObject {
    fn drop(&mut self) {
        trace!(path = %self.path, "Released object reader");
    }
}

impl AsyncRead for OpenedObject {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.reader.as_mut().poll_read(cx, buf)
    }
}

impl AsyncSeek for OpenedObject {
    fn start_seek(mut self: Pin<&mut Self>, position: io::SeekFrom) -> io::Result<()> {
        self.reader.as_mut().start_seek(position)
    }

    fn poll_complete(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        self.reader.as_mut().poll_complete(cx)
    }
}

/// Capability set of a storage-service client.
///
/// Paths are relative to the root of the client's namespace.
#[async_trait]
pub trait StorageClient: Send + Sync + std::fmt::Debug {
    /// Open an object for reading.
    async fn open(&self, path: &Path) -> Result<OpenedObject, StorageError>;

    /// Status of `path`, or `None` if nothing exists there.
    async fn status(&self, path: &Path) -> Result<Option<EntryStatus>, StorageError>;

    /// Immediate children of `path`, sorted by path.
    ///
    /// A path naming a file lists as that single file.
    async fn list(&self, path: &Path) -> Result<Vec<EntryStatus>, StorageError>;

    /// Delete `path`.
    ///
    /// Returns `false` if nothing existed. Deleting a directory that still has
    /// children fails unless `recursive` is set.
    async fn delete(&self, path: &Path, recursive: bool) -> Result<bool, StorageError>;

    /// Entries matching a glob pattern, sorted by path.
    async fn glob(&self, pattern: &str) -> Result<Vec<EntryStatus>, StorageError> {
        glob::expand(self, pattern).await
    }
}
