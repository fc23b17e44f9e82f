//! Shared filesystem handle and the context that owns it.
//!
//! A [`StorageContext`] holds the configuration cache and at most one
//! [`FilesystemHandle`]. The first successful [`StorageContext::acquire`]
//! builds the handle; every later call returns that same handle whatever
//! locator it names, so one context serves exactly one storage target.

use std::sync::Arc;

use object_store::path::Path;
use snafu::prelude::*;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::codec::CodecRegistry;
use crate::config::{ConfigCache, Locator, SchemeConfiguration};
use crate::container::{SequenceHeader, read_sequence_header};
use crate::error::{AccessError, StorageError, TaskJoinSnafu};
use crate::resolver::{self, DeleteReport};
use crate::sniffer::{self, FileType};
use crate::storage::{EntryStatus, StorageClient, build_client};

/// A storage client bound to one configuration bundle.
///
/// The caller identity is recorded in the bundle under
/// [`IDENTITY_KEY`](crate::config::IDENTITY_KEY) and is not translated into
/// backend credentials. Backends authenticate from their own properties and
/// environment.
#[derive(Debug)]
pub struct FilesystemHandle {
    client: Arc<dyn StorageClient>,
    configuration: Arc<SchemeConfiguration>,
    codecs: CodecRegistry,
}

impl FilesystemHandle {
    pub fn new(client: Arc<dyn StorageClient>, configuration: Arc<SchemeConfiguration>) -> Self {
        let codecs = CodecRegistry::from_configuration(&configuration);
        Self {
            client,
            configuration,
            codecs,
        }
    }

    /// Build the backend client the bundle selects.
    pub async fn from_configuration(
        configuration: Arc<SchemeConfiguration>,
    ) -> Result<Self, StorageError> {
        let client = build_client(&configuration).await?;
        Ok(Self::new(Arc::new(client), configuration))
    }

    pub fn client(&self) -> &Arc<dyn StorageClient> {
        &self.client
    }

    pub fn configuration(&self) -> &Arc<SchemeConfiguration> {
        &self.configuration
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    /// The identity the handle was acquired for, if any.
    pub fn identity(&self) -> Option<&str> {
        self.configuration.identity()
    }

    /// Convert a locator or bare path into a path relative to the client's root.
    pub fn resolve_path(&self, locator: &str) -> Result<Path, AccessError> {
        let path = Locator::parse(locator)?
            .object_path()
            .map_err(|e| StorageError::ObjectStore { source: e.into() })?;
        Ok(path)
    }

    /// Best-effort listing; see [`resolver::list_entries`].
    pub async fn list_entries(&self, locator: &str, use_glob: bool) -> Vec<EntryStatus> {
        resolver::list_entries(self.client.as_ref(), &Locator::raw_path(locator), use_glob).await
    }

    pub async fn try_list_entries(
        &self,
        locator: &str,
        use_glob: bool,
    ) -> Result<Vec<EntryStatus>, StorageError> {
        resolver::try_list_entries(self.client.as_ref(), &Locator::raw_path(locator), use_glob)
            .await
    }

    pub async fn delete_entries(
        &self,
        locator: &str,
        recursive: bool,
        use_glob: bool,
    ) -> DeleteReport {
        resolver::delete_entries(
            self.client.as_ref(),
            &Locator::raw_path(locator),
            recursive,
            use_glob,
        )
        .await
    }

    /// Classify a file with the codecs enabled for this handle's bundle.
    pub async fn classify(&self, locator: &str) -> Result<FileType, AccessError> {
        let path = self.resolve_path(locator)?;
        Ok(sniffer::classify_with(self.client.as_ref(), &path, &self.codecs).await?)
    }

    pub async fn read_sequence_header(&self, locator: &str) -> Result<SequenceHeader, AccessError> {
        let path = self.resolve_path(locator)?;
        Ok(read_sequence_header(self.client.as_ref(), &path).await?)
    }
}

/// Owner of the configuration cache and the single filesystem handle.
#[derive(Debug, Default)]
pub struct StorageContext {
    configs: Arc<ConfigCache>,
    handle: OnceCell<Arc<FilesystemHandle>>,
}

impl StorageContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context whose configuration cache reads its default resource under `home`.
    pub fn with_home(home: impl Into<std::path::PathBuf>) -> Self {
        Self {
            configs: Arc::new(ConfigCache::with_home(home)),
            handle: OnceCell::new(),
        }
    }

    pub fn configs(&self) -> &ConfigCache {
        &self.configs
    }

    /// The handle, once one has been acquired.
    pub fn handle(&self) -> Option<&Arc<FilesystemHandle>> {
        self.handle.get()
    }

    /// Return the filesystem handle, building it on first use.
    ///
    /// Only the first successful call resolves configuration and builds a
    /// client. Later calls return the same handle and ignore their arguments,
    /// even when they name a different target. A failed first call leaves the
    /// context empty so a later call can retry.
    pub async fn acquire(
        &self,
        locator: &str,
        identity: Option<&str>,
        config_path: Option<&str>,
    ) -> Result<Arc<FilesystemHandle>, AccessError> {
        if let Some(handle) = self.handle.get() {
            Self::note_reuse(handle, locator);
            return Ok(handle.clone());
        }

        let handle = self
            .handle
            .get_or_try_init(|| async {
                let configuration = self.resolve_configuration(locator, identity, config_path).await?;
                let handle = FilesystemHandle::from_configuration(configuration).await?;
                info!(
                    scheme = handle.configuration.scheme().unwrap_or_default(),
                    endpoint = handle.configuration.default_endpoint().unwrap_or_default(),
                    identity = handle.identity().unwrap_or_default(),
                    "Acquired filesystem handle"
                );
                Ok::<_, AccessError>(Arc::new(handle))
            })
            .await?;
        Ok(handle.clone())
    }

    /// Resolve the bundle for `locator` on the blocking pool.
    pub async fn resolve_configuration(
        &self,
        locator: &str,
        identity: Option<&str>,
        config_path: Option<&str>,
    ) -> Result<Arc<SchemeConfiguration>, AccessError> {
        let configs = Arc::clone(&self.configs);
        let locator = locator.to_string();
        let identity = identity.map(str::to_string);
        let config_path = config_path.map(str::to_string);

        let configuration = tokio::task::spawn_blocking(move || {
            configs.resolve(&locator, identity.as_deref(), config_path.as_deref())
        })
        .await
        .context(TaskJoinSnafu)??;
        Ok(configuration)
    }

    fn note_reuse(handle: &FilesystemHandle, locator: &str) {
        let requested = Locator::parse(locator).ok();
        let requested_scheme = requested.as_ref().and_then(Locator::scheme);
        let requested_endpoint = requested.as_ref().and_then(Locator::endpoint);

        let configuration = handle.configuration();
        if requested_scheme != configuration.scheme()
            || requested_endpoint.as_deref() != configuration.default_endpoint()
        {
            debug!(
                locator,
                bound_to = configuration.default_endpoint().unwrap_or_default(),
                "Reusing filesystem handle bound to another target"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IDENTITY_KEY;
    use crate::storage::ObjectStoreClient;
    use tempfile::TempDir;

    fn memory_home() -> TempDir {
        let home = TempDir::new().unwrap();
        let dir = home.path().join("config");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(crate::config::DEFAULT_CONFIG_FILENAME),
            "fs:\n  storage:\n    impl: memory\n  other:\n    impl: memory\n",
        )
        .unwrap();
        home
    }

    #[tokio::test]
    async fn test_acquire_returns_same_handle_for_different_locators() {
        let home = memory_home();
        let context = StorageContext::with_home(home.path());

        let first = context
            .acquire("storage://nodeA:9000/data/in", Some("user1"), None)
            .await
            .unwrap();
        let second = context
            .acquire("other://nodeB:9001/elsewhere", Some("user2"), None)
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.configuration().scheme(), Some("storage"));
        assert_eq!(
            second.configuration().get(IDENTITY_KEY),
            Some("user1")
        );
        assert_eq!(context.configs().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_acquire_builds_once() {
        let home = memory_home();
        let context = Arc::new(StorageContext::with_home(home.path()));

        let mut acquires = Vec::new();
        let mut resolves = Vec::new();
        for i in 0..16 {
            let context = Arc::clone(&context);
            let configs = Arc::clone(&context.configs);
            acquires.push(tokio::spawn(async move {
                let locator = format!("storage://nodeA:9000/data/{i}");
                context.acquire(&locator, Some("user1"), None).await
            }));

            resolves.push(tokio::task::spawn_blocking(move || {
                configs.resolve("storage://nodeA:9000/other", Some("user1"), None)
            }));
        }

        let mut handles = Vec::new();
        for task in acquires {
            handles.push(task.await.unwrap().unwrap());
        }
        let mut bundles = Vec::new();
        for task in resolves {
            bundles.push(task.await.unwrap().unwrap());
        }

        let first = &handles[0];
        assert!(handles.iter().all(|handle| Arc::ptr_eq(handle, first)));
        assert!(
            bundles
                .iter()
                .all(|bundle| Arc::ptr_eq(bundle, first.configuration()))
        );
        assert_eq!(context.configs().len(), 1);
        assert_eq!(first.identity(), Some("user1"));
    }

    #[tokio::test]
    async fn test_failed_acquire_can_be_retried() {
        let home = TempDir::new().unwrap();
        let context = StorageContext::with_home(home.path());

        let err = context
            .acquire("hdfs://namenode:8020/data", None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AccessError::Storage {
                source: StorageError::UnsupportedScheme { .. }
            }
        ));
        assert!(context.handle().is_none());

        let handle = context.acquire("memory:///data", None, None).await.unwrap();
        assert_eq!(handle.configuration().scheme(), Some("memory"));
    }

    #[tokio::test]
    async fn test_invalid_locator_fails_acquire() {
        let context = StorageContext::with_home(TempDir::new().unwrap().path());
        let err = context
            .acquire("storage://nodeA:bad/x", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::Config { .. }));
    }

    #[tokio::test]
    async fn test_handle_operations() {
        let client = ObjectStoreClient::in_memory();
        client
            .put(&Path::from("data/part-0000.gz"), b"xx".to_vec())
            .await
            .unwrap();
        client
            .put(&Path::from("data/part-0001"), b"SEQ\x06".to_vec())
            .await
            .unwrap();

        let handle = FilesystemHandle::new(
            Arc::new(client),
            Arc::new(SchemeConfiguration::default()),
        );

        let entries = handle.list_entries("memory:///data/part-*", true).await;
        assert_eq!(entries.len(), 2);

        assert_eq!(
            handle.classify("memory:///data/part-0000.gz").await.unwrap(),
            FileType::CompressedText
        );
        assert_eq!(
            handle.classify("/data/part-0001").await.unwrap(),
            FileType::SequenceContainer
        );

        let report = handle.delete_entries("memory:///data", false, false).await;
        assert!(report.is_success());
        assert!(handle.list_entries("data", false).await.is_empty());
    }

    #[test]
    fn test_resolve_path() {
        let handle = FilesystemHandle::new(
            Arc::new(ObjectStoreClient::in_memory()),
            Arc::new(SchemeConfiguration::default()),
        );
        assert_eq!(
            handle.resolve_path("storage://nodeA:9000/data/in").unwrap(),
            Path::from("data/in")
        );
        assert_eq!(handle.resolve_path("/data/in").unwrap(), Path::from("data/in"));
    }
}
