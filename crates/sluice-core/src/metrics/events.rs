//! Internal events for storage access metrics.
//!
//! Each event struct represents a measurable occurrence. Events implement
//! [`InternalEvent`], which records the corresponding metric.

use metrics::{counter, histogram};
use std::time::Duration;
use tracing::trace;

use crate::sniffer::FileType;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    fn emit(self);
}

/// Type of storage operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOperation {
    Head,
    Put,
    List,
    Delete,
}

impl StorageOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageOperation::Head => "head",
            StorageOperation::Put => "put",
            StorageOperation::List => "list",
            StorageOperation::Delete => "delete",
        }
    }
}

/// Status of a storage request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Success,
    NotFound,
    Error,
}

impl RequestStatus {
    pub fn of<T>(result: &object_store::Result<T>) -> Self {
        match result {
            Ok(_) => RequestStatus::Success,
            Err(object_store::Error::NotFound { .. }) => RequestStatus::NotFound,
            Err(_) => RequestStatus::Error,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Success => "success",
            RequestStatus::NotFound => "not_found",
            RequestStatus::Error => "error",
        }
    }
}

/// Event emitted when a storage request completes.
pub struct StorageRequest {
    pub operation: StorageOperation,
    pub status: RequestStatus,
}

impl InternalEvent for StorageRequest {
    fn emit(self) {
        trace!(
            operation = self.operation.as_str(),
            status = self.status.as_str(),
            "Storage request"
        );
        counter!(
            "sluice_storage_requests_total",
            "operation" => self.operation.as_str(),
            "status" => self.status.as_str()
        )
        .increment(1);
    }
}

/// Event emitted when a storage request completes with duration.
pub struct StorageRequestDuration {
    pub operation: StorageOperation,
    pub duration: Duration,
}

impl InternalEvent for StorageRequestDuration {
    fn emit(self) {
        trace!(
            operation = self.operation.as_str(),
            duration_ms = self.duration.as_millis(),
            "Storage request duration"
        );
        histogram!(
            "sluice_storage_request_duration_seconds",
            "operation" => self.operation.as_str()
        )
        .record(self.duration.as_secs_f64());
    }
}

/// Event emitted after a directory listing or glob expansion.
pub struct EntriesListed {
    pub count: usize,
    pub glob: bool,
}

impl InternalEvent for EntriesListed {
    fn emit(self) {
        let mode = if self.glob { "glob" } else { "literal" };
        trace!(count = self.count, mode, "Entries listed");
        counter!("sluice_entries_listed_total", "mode" => mode).increment(self.count as u64);
    }
}

/// Event emitted when a single entry of a batch delete fails.
pub struct EntryDeleteFailed;

impl InternalEvent for EntryDeleteFailed {
    fn emit(self) {
        counter!("sluice_entry_delete_failures_total").increment(1);
    }
}

/// Event emitted when a file has been classified.
pub struct FileClassified {
    pub file_type: FileType,
}

impl InternalEvent for FileClassified {
    fn emit(self) {
        trace!(file_type = self.file_type.as_str(), "File classified");
        counter!("sluice_files_classified_total", "type" => self.file_type.as_str()).increment(1);
    }
}
