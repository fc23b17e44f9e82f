//! S3 (and S3-compatible) backend.
//!
//! For `s3://` and `s3a://` bundles the endpoint host is the bucket. Any other
//! scheme mapped to S3 through `fs.<scheme>.impl` treats its `host:port` as an
//! S3-compatible endpoint, and the bucket must come from `fs.s3.bucket`.

use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::ObjectStore;
use snafu::prelude::*;
use tracing::debug;

use super::ObjectStoreClient;
use super::backend::{endpoint_url, native_host, no_retry};
use crate::config::SchemeConfiguration;
use crate::error::{BackendBuildSnafu, StorageError};

pub const S3_BUCKET_KEY: &str = "fs.s3.bucket";
pub const S3_ENDPOINT_KEY: &str = "fs.s3.endpoint";

const S3_SCHEMES: &[&str] = &["s3", "s3a"];

impl ObjectStoreClient {
    pub(super) fn construct_s3(config: &SchemeConfiguration) -> Result<Self, StorageError> {
        let bucket = config
            .get(S3_BUCKET_KEY)
            .map(str::to_string)
            .or_else(|| native_host(config, S3_SCHEMES));

        let endpoint = config.get(S3_ENDPOINT_KEY).map(str::to_string).or_else(|| {
            if native_host(config, S3_SCHEMES).is_some() {
                return None;
            }
            let url = endpoint_url(config)?;
            let host = url.host_str().filter(|h| !h.is_empty())?;
            Some(match url.port() {
                Some(port) => format!("http://{host}:{port}"),
                None => format!("http://{host}"),
            })
        });

        let mut builder = AmazonS3Builder::from_env().with_retry(no_retry());
        if let Some(bucket) = &bucket {
            builder = builder.with_bucket_name(bucket);
        }

        for (key, value) in config.with_prefix("aws_") {
            builder = builder.with_config(
                key.parse().context(BackendBuildSnafu { backend: "S3" })?,
                value,
            );
        }

        if let Some(endpoint) = &endpoint {
            debug!(endpoint, "Using S3-compatible endpoint");
            builder = builder
                .with_endpoint(endpoint)
                .with_virtual_hosted_style_request(false)
                .with_allow_http(true);
        }

        let canonical_url = match (&endpoint, &bucket) {
            (Some(endpoint), Some(bucket)) => format!("s3::{endpoint}/{bucket}"),
            (_, Some(bucket)) => format!("s3://{bucket}"),
            _ => "s3://".to_string(),
        };

        let store: Arc<dyn ObjectStore> =
            Arc::new(builder.build().context(BackendBuildSnafu { backend: "S3" })?);
        Ok(Self::new(store, canonical_url))
    }
}
