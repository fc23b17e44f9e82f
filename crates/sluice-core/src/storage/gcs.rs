//! Google Cloud Storage backend.

use std::sync::Arc;

use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::ObjectStore;
use snafu::prelude::*;

use super::ObjectStoreClient;
use super::backend::{native_host, no_retry};
use crate::config::SchemeConfiguration;
use crate::error::{BackendBuildSnafu, StorageError};

pub const GCS_BUCKET_KEY: &str = "fs.gs.bucket";

impl ObjectStoreClient {
    pub(super) fn construct_gcs(config: &SchemeConfiguration) -> Result<Self, StorageError> {
        let bucket = config
            .get(GCS_BUCKET_KEY)
            .map(str::to_string)
            .or_else(|| native_host(config, &["gs"]));

        let mut builder = GoogleCloudStorageBuilder::from_env().with_retry(no_retry());
        if let Some(bucket) = &bucket {
            builder = builder.with_bucket_name(bucket);
        }

        for (key, value) in config.with_prefix("google_") {
            builder = builder.with_config(
                key.parse().context(BackendBuildSnafu { backend: "GCS" })?,
                value,
            );
        }

        let canonical_url = format!("gs://{}", bucket.unwrap_or_default());
        let store: Arc<dyn ObjectStore> =
            Arc::new(builder.build().context(BackendBuildSnafu { backend: "GCS" })?);
        Ok(Self::new(store, canonical_url))
    }
}
