//! HTTP providers
//!
//! Concrete [`Embedder`] and [`VectorIndex`] implementations over a
//! Titan-style embedding endpoint and a REST vector index. Both run
//! with bounded timeouts; the embedder additionally retries transient
//! failures with exponential backoff.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, VectorError};
use crate::vector::{Embedder, VectorHit, VectorIndex, VectorRecord, METADATA_LIMIT_BYTES};

// ============================================================================
// EMBEDDING CLIENT
// ============================================================================

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    #[serde(rename = "inputText")]
    input_text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// HTTP embedding provider.
pub struct HttpEmbedder {
    url: String,
    dimension: usize,
    max_retries: u32,
    http: reqwest::Client,
}

impl HttpEmbedder {
    pub fn new(url: String, dimension: usize, timeout: Duration, max_retries: u32) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            url,
            dimension,
            max_retries,
            http,
        }
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let response = self
            .http
            .post(&self.url)
            .json(&EmbedRequest { input_text: text })
            .send()
            .await
            .map_err(|e| EmbeddingError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmbeddingError::Status(response.status().as_u16()));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Parse(e.to_string()))?;

        if body.embedding.len() != self.dimension {
            return Err(EmbeddingError::Dimension {
                expected: self.dimension,
                actual: body.embedding.len(),
            });
        }

        Ok(body.embedding)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut attempt = 0u32;
        loop {
            match self.request_embedding(text).await {
                Ok(vector) => return Ok(vector),
                Err(err) if attempt < self.max_retries && err.is_retryable() => {
                    let delay = Duration::from_millis(250 * 2u64.pow(attempt));
                    tracing::debug!(
                        "embedding attempt {} failed ({}), retrying in {:?}",
                        attempt + 1,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// VECTOR INDEX CLIENT
// ============================================================================

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    #[serde(rename = "queryVector")]
    query_vector: &'a [f32],
    #[serde(rename = "topK")]
    top_k: usize,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<VectorHit>,
}

/// HTTP vector index client.
pub struct HttpVectorIndex {
    base_url: String,
    http: reqwest::Client,
}

impl HttpVectorIndex {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { base_url, http }
    }
}

#[async_trait]
impl VectorIndex for HttpVectorIndex {
    async fn upsert(&self, record: VectorRecord) -> Result<(), VectorError> {
        // The metadata budget is a store-side limit; reject locally
        // instead of round-tripping a request that will fail.
        let metadata_len = serde_json::to_string(&record.metadata)
            .map_err(|e| VectorError::Parse(e.to_string()))?
            .len();
        if metadata_len > METADATA_LIMIT_BYTES {
            return Err(VectorError::MetadataTooLarge(metadata_len));
        }

        let url = format!("{}/vectors", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&record)
            .send()
            .await
            .map_err(|e| VectorError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(VectorError::Status(response.status().as_u16()));
        }

        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorHit>, VectorError> {
        let url = format!("{}/query", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&QueryRequest {
                query_vector: vector,
                top_k,
            })
            .send()
            .await
            .map_err(|e| VectorError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(VectorError::Status(response.status().as_u16()));
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| VectorError::Parse(e.to_string()))?;

        Ok(body.matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_request_uses_titan_field_name() {
        let body = serde_json::to_string(&EmbedRequest { input_text: "probe" }).unwrap();
        assert_eq!(body, r#"{"inputText":"probe"}"#);
    }

    #[test]
    fn query_response_tolerates_missing_matches() {
        let parsed: QueryResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.matches.is_empty());

        let parsed: QueryResponse = serde_json::from_str(
            r#"{"matches":[{"key":"k1","distance":0.2,"metadata":{"source_agent":"db-admin-001"}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.matches.len(), 1);
        assert!((parsed.matches[0].distance - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn retryable_errors() {
        assert!(EmbeddingError::Network("reset".into()).is_retryable());
        assert!(EmbeddingError::Status(503).is_retryable());
        assert!(!EmbeddingError::Status(400).is_retryable());
        assert!(!EmbeddingError::Dimension { expected: 1536, actual: 3 }.is_retryable());
    }

    #[tokio::test]
    async fn oversized_metadata_is_rejected_locally() {
        let index = HttpVectorIndex::new("http://127.0.0.1:9".to_string(), Duration::from_secs(1));
        let mut metadata = serde_json::Map::new();
        metadata.insert("blob".to_string(), serde_json::Value::from("x".repeat(4096)));

        let result = index
            .upsert(VectorRecord {
                key: "k".to_string(),
                vector: vec![0.0; 4],
                metadata,
            })
            .await;

        assert!(matches!(result, Err(VectorError::MetadataTooLarge(_))));
    }
}
