//! sluice-core: storage access layer for ETL readers.
//!
//! Sits between a reader and a hierarchical storage service:
//!
//! - `config/` - Per-scheme configuration bundles, loaded from YAML and cached
//! - `handle` - The shared filesystem handle and the context that owns it
//! - `resolver` - Listing and batch deletion, literal or by glob
//! - `sniffer` - File-type classification by magic bytes and codec suffix
//! - `container` - Sequence-container header reader
//! - `codec` - Compression codecs keyed by file-name suffix
//! - `storage/` - Storage client abstraction over `object_store` backends
//! - `metrics/` - Internal metric events
//! - `error` - Error types

pub mod codec;
pub mod config;
pub mod container;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod resolver;
pub mod sniffer;
pub mod storage;
pub mod tracing;

pub use codec::{CodecRegistry, CompressionCodec};
pub use config::{ConfigCache, Locator, SchemeConfiguration};
pub use container::{SequenceHeader, WritableType, read_sequence_header};
pub use error::{AccessError, ConfigError, StorageError};
pub use handle::{FilesystemHandle, StorageContext};
pub use resolver::{DeleteOutcome, DeleteReport, delete_entries, list_entries, try_list_entries};
pub use sniffer::{FileType, classify, classify_with};
pub use storage::{EntryStatus, ObjectStoreClient, StorageClient};
pub use self::tracing::init_tracing;
