//! Local filesystem backend.

use std::sync::Arc;

use object_store::ObjectStore;
use object_store::local::LocalFileSystem;
use snafu::prelude::*;

use super::ObjectStoreClient;
use crate::config::SchemeConfiguration;
use crate::error::{BackendBuildSnafu, IoSnafu, StorageError};

/// Property rooting the local namespace somewhere other than `/`.
pub const LOCAL_ROOT_KEY: &str = "fs.local.root";

impl ObjectStoreClient {
    pub(super) async fn construct_local(config: &SchemeConfiguration) -> Result<Self, StorageError> {
        let root = config.get(LOCAL_ROOT_KEY).unwrap_or("/");

        tokio::fs::create_dir_all(root).await.context(IoSnafu)?;
        let store = LocalFileSystem::new_with_prefix(root)
            .context(BackendBuildSnafu { backend: "local" })?
            .with_automatic_cleanup(true);

        let canonical_url = match root.trim_end_matches('/') {
            "" => "file:///".to_string(),
            root => format!("file://{root}"),
        };
        let store: Arc<dyn ObjectStore> = Arc::new(store);
        Ok(Self::new(store, canonical_url).with_local_root(root))
    }
}
