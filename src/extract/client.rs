//! Document-analysis service client.
//!
//! The service consumes a previously uploaded blob (addressed by bucket and
//! storage key) and returns forms/tables analysis as a flat list of blocks:
//! `KEY_VALUE_SET` blocks tagged `KEY` or `VALUE` connected by `CHILD` and
//! `VALUE` relationship links down to `WORD` blocks carrying text.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use snafu::prelude::*;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::config::ExtractionConfig;
use crate::error::{ExtractError, RequestSnafu, ResponseDecodeSnafu, ServiceStatusSnafu};

/// Flattened key text to value text mapping derived from an analysis.
pub type KvMap = HashMap<String, String>;

/// Boundary trait for the field-extraction collaborator.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    /// Analyze a stored document and return its key/value pairs.
    async fn analyze(&self, key: &str) -> Result<KvMap, ExtractError>;
}

/// One block of the analysis response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Block {
    pub id: String,
    pub block_type: String,
    #[serde(default)]
    pub entity_types: Vec<String>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub text: Option<String>,
}

/// A typed edge between blocks.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Relationship {
    #[serde(rename = "Type")]
    pub kind: String,
    pub ids: Vec<String>,
}

/// Top-level analysis response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnalyzeResponse {
    pub blocks: Vec<Block>,
}

/// Flatten the block graph into a key text -> value text mapping.
///
/// For each `KEY_VALUE_SET` block tagged `KEY`: the key text is the joined
/// text of its `CHILD` blocks; the value text is the joined text of the
/// `CHILD` blocks of the block its `VALUE` relationship points at. Keys that
/// flatten to empty text are skipped.
pub fn kv_map(response: &AnalyzeResponse) -> KvMap {
    let block_map: HashMap<&str, &Block> = response
        .blocks
        .iter()
        .map(|b| (b.id.as_str(), b))
        .collect();

    let join_text = |ids: &[String]| -> String {
        ids.iter()
            .filter_map(|id| block_map.get(id.as_str()))
            .filter_map(|b| b.text.as_deref())
            .collect::<Vec<_>>()
            .join(" ")
    };

    let mut kvs = KvMap::new();
    for block in &response.blocks {
        if block.block_type != "KEY_VALUE_SET"
            || !block.entity_types.iter().any(|e| e == "KEY")
        {
            continue;
        }

        let mut key = String::new();
        let mut value = String::new();
        for rel in &block.relationships {
            match rel.kind.as_str() {
                "CHILD" => key = join_text(&rel.ids),
                "VALUE" => {
                    for val_id in &rel.ids {
                        let Some(val_block) = block_map.get(val_id.as_str()) else {
                            continue;
                        };
                        for val_rel in &val_block.relationships {
                            if val_rel.kind == "CHILD" {
                                value = join_text(&val_rel.ids);
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        if !key.trim().is_empty() {
            kvs.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    kvs
}

/// HTTP implementation of the analysis boundary.
pub struct AnalysisClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    bucket: String,
}

impl AnalysisClient {
    /// Create a client from configuration.
    ///
    /// `bucket` is the namespace the documents were uploaded under; it is
    /// sent with every analysis request so the service can locate the blob.
    pub fn new(config: &ExtractionConfig, bucket: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl FieldExtractor for AnalysisClient {
    async fn analyze(&self, key: &str) -> Result<KvMap, ExtractError> {
        let url = format!("{}/analyze", self.endpoint);
        let body = serde_json::json!({
            "bucket": self.bucket,
            "key": key,
            "features": ["FORMS", "TABLES"],
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.context(RequestSnafu { key })?;

        ensure!(
            response.status().is_success(),
            ServiceStatusSnafu {
                status: response.status().as_u16(),
                key,
            }
        );

        let parsed: AnalyzeResponse = response
            .json()
            .await
            .context(ResponseDecodeSnafu { key })?;

        let kvs = kv_map(&parsed);
        debug!("Analysis for {} produced {} key/value pairs", key, kvs.len());
        Ok(kvs)
    }
}
