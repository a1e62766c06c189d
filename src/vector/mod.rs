//! Embedding and vector index seams
//!
//! The fingerprint recorder and similarity service talk to these
//! traits, never to a concrete provider. HTTP implementations live in
//! [`http`]; tests substitute failing or canned providers.

pub mod http;

pub use http::{HttpEmbedder, HttpVectorIndex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EmbeddingError, VectorError};

/// Hard cap on serialized vector-record metadata.
pub const METADATA_LIMIT_BYTES: usize = 2048;

/// A stored vector with its metadata. Never required for correctness:
/// the append-only fingerprint log is authoritative and the index can
/// be rebuilt from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub key: String,
    pub vector: Vec<f32>,
    pub metadata: Map<String, Value>,
}

/// One nearest-neighbor result (cosine distance, lower is closer).
#[derive(Debug, Clone, Deserialize)]
pub struct VectorHit {
    pub key: String,
    pub distance: f32,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Text-to-vector provider with a fixed output dimension.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn dimension(&self) -> usize;
}

/// Vector store supporting upsert and top-k nearest-neighbor queries.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(&self, record: VectorRecord) -> Result<(), VectorError>;

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorHit>, VectorError>;
}
