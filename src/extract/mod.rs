//! Field extraction from uploaded documents.
//!
//! - `client`: the document-analysis service boundary and its block model
//! - `normalize`: mapping raw key/value labels onto the canonical schema

mod client;
mod normalize;

pub use client::{AnalysisClient, AnalyzeResponse, Block, FieldExtractor, KvMap, Relationship,
    kv_map};
pub use normalize::{InvoiceFields, normalize};
