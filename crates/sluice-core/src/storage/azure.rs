//! Azure Blob Storage backend.
//!
//! `az://<container>` bundles take the container from the host. For `abfs`
//! and `abfss` the host names the account, so the container comes from
//! `fs.azure.container`.

use std::sync::Arc;

use object_store::azure::MicrosoftAzureBuilder;
use object_store::ObjectStore;
use snafu::prelude::*;

use super::ObjectStoreClient;
use super::backend::{endpoint_url, native_host, no_retry};
use crate::config::SchemeConfiguration;
use crate::error::{BackendBuildSnafu, StorageError};

pub const AZURE_CONTAINER_KEY: &str = "fs.azure.container";

impl ObjectStoreClient {
    pub(super) fn construct_azure(config: &SchemeConfiguration) -> Result<Self, StorageError> {
        let container = config
            .get(AZURE_CONTAINER_KEY)
            .map(str::to_string)
            .or_else(|| native_host(config, &["az"]));

        let account = native_host(config, &["abfs", "abfss"])
            .and_then(|host| host.split('.').next().map(str::to_string));

        let mut builder = MicrosoftAzureBuilder::from_env().with_retry(no_retry());
        if let Some(container) = &container {
            builder = builder.with_container_name(container);
        }
        if let Some(account) = &account {
            builder = builder.with_account(account);
        }

        for (key, value) in config.with_prefix("azure_") {
            builder = builder.with_config(
                key.parse().context(BackendBuildSnafu { backend: "Azure" })?,
                value,
            );
        }

        let canonical_url = match endpoint_url(config) {
            Some(url) if account.is_some() => format!(
                "{}://{}@{}",
                url.scheme(),
                container.unwrap_or_default(),
                url.host_str().unwrap_or_default()
            ),
            _ => format!("az://{}", container.unwrap_or_default()),
        };

        let store: Arc<dyn ObjectStore> =
            Arc::new(builder.build().context(BackendBuildSnafu { backend: "Azure" })?);
        Ok(Self::new(store, canonical_url))
    }
}
