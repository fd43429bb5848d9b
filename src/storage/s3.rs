//! S3 storage backend implementation.

use object_store::ObjectStore;
use object_store::RetryConfig;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use snafu::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{S3ConfigSnafu, StorageError};

use super::{BackendConfig, StorageProvider};

/// S3 storage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Config {
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub bucket: String,
    pub key: Option<Path>,
}

impl S3Config {
    /// Canonical URL form, used for logging and debug output.
    fn canonical_url(&self) -> String {
        let base = match (&self.endpoint, &self.region) {
            (Some(endpoint), _) => format!("s3::{}/{}", endpoint, self.bucket),
            (None, Some(region)) => {
                format!("https://s3.{}.amazonaws.com/{}", region, self.bucket)
            }
            (None, None) => format!("https://s3.amazonaws.com/{}", self.bucket),
        };
        match &self.key {
            Some(key) => format!("{base}/{key}"),
            None => base,
        }
    }
}

impl StorageProvider {
    pub(super) async fn construct_s3(
        config: S3Config,
        options: HashMap<String, String>,
    ) -> Result<Self, StorageError> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(&config.bucket)
            .with_retry(RetryConfig::default());

        // Explicit options first; anything parsed out of the URL wins.
        for (option, value) in &options {
            builder = builder.with_config(option.parse().context(S3ConfigSnafu)?, value.clone());
        }

        if let Some(region) = &config.region {
            builder = builder.with_region(region);
        }

        // A custom endpoint means a non-AWS target (minio and friends):
        // path-style addressing, plain http allowed.
        if let Some(endpoint) = &config.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_virtual_hosted_style_request(false)
                .with_allow_http(true);
        }

        let object_store: Arc<dyn ObjectStore> = Arc::new(builder.build().context(S3ConfigSnafu)?);
        let canonical_url = config.canonical_url();

        Ok(Self {
            config: BackendConfig::S3(config),
            object_store,
            canonical_url,
        })
    }
}
