//! Similarity queries
//!
//! Correlates a live interaction against stored fingerprints. The read
//! path never fails: any embedding or index problem yields an empty
//! result, which callers treat as "no similar patterns found".

use std::cmp::Ordering;
use std::sync::Arc;

use serde_json::Value;

use crate::fingerprint::{SimilarityMatch, ThreatLevel};
use crate::telemetry::DegradeCounters;
use crate::vector::{Embedder, VectorIndex};

/// Top-k similarity search over the fingerprint index.
pub struct SimilarityService {
    embedder: Option<Arc<dyn Embedder>>,
    index: Option<Arc<dyn VectorIndex>>,
    threshold: f32,
    top_k: usize,
    counters: Arc<DegradeCounters>,
}

impl SimilarityService {
    pub fn new(
        embedder: Option<Arc<dyn Embedder>>,
        index: Option<Arc<dyn VectorIndex>>,
        threshold: f32,
        top_k: usize,
        counters: Arc<DegradeCounters>,
    ) -> Self {
        Self {
            embedder,
            index,
            threshold,
            top_k,
            counters,
        }
    }

    /// Find prior fingerprints similar to `text`, best first.
    /// Returns an empty vec on any failure.
    pub async fn query(&self, text: &str) -> Vec<SimilarityMatch> {
        let (Some(embedder), Some(index)) = (&self.embedder, &self.index) else {
            return Vec::new();
        };

        let vector = match embedder.embed(text).await {
            Ok(vector) => vector,
            Err(err) => {
                self.counters.record_embedding_failure();
                tracing::warn!("query embedding failed: {}", err);
                return Vec::new();
            }
        };

        let hits = match index.query(&vector, self.top_k).await {
            Ok(hits) => hits,
            Err(err) => {
                self.counters.record_vector_query_failure();
                tracing::warn!("vector query failed: {}", err);
                return Vec::new();
            }
        };

        let mut matches: Vec<SimilarityMatch> = hits
            .into_iter()
            .filter_map(|hit| {
                let similarity = 1.0 - hit.distance;
                if similarity < self.threshold {
                    return None;
                }

                let metadata = &hit.metadata;
                Some(SimilarityMatch {
                    similarity,
                    source_agent: metadata
                        .get("source_agent")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown")
                        .to_string(),
                    threat_level: metadata
                        .get("threat_level")
                        .and_then(Value::as_str)
                        .map(ThreatLevel::parse)
                        .unwrap_or(ThreatLevel::Unknown),
                    indicators: metadata
                        .get("indicators")
                        .and_then(Value::as_str)
                        .map(split_indicators)
                        .unwrap_or_default(),
                    timestamp: metadata
                        .get("timestamp")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });
        matches
    }
}

fn split_indicators(encoded: &str) -> Vec<String> {
    encoded
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EmbeddingError, VectorError};
    use crate::vector::{VectorHit, VectorRecord};
    use async_trait::async_trait;
    use serde_json::Map;

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![0.5; 4])
        }

        fn dimension(&self) -> usize {
            4
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::Status(503))
        }

        fn dimension(&self) -> usize {
            4
        }
    }

    struct CannedIndex(Vec<VectorHit>);

    #[async_trait]
    impl VectorIndex for CannedIndex {
        async fn upsert(&self, _record: VectorRecord) -> Result<(), VectorError> {
            Ok(())
        }

        async fn query(&self, _vector: &[f32], _top_k: usize) -> Result<Vec<VectorHit>, VectorError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenIndex;

    #[async_trait]
    impl VectorIndex for BrokenIndex {
        async fn upsert(&self, _record: VectorRecord) -> Result<(), VectorError> {
            Err(VectorError::Network("timed out".into()))
        }

        async fn query(&self, _vector: &[f32], _top_k: usize) -> Result<Vec<VectorHit>, VectorError> {
            Err(VectorError::Network("timed out".into()))
        }
    }

    fn hit(key: &str, distance: f32, agent: &str, level: &str) -> VectorHit {
        let mut metadata = Map::new();
        metadata.insert("source_agent".to_string(), Value::from(agent));
        metadata.insert("threat_level".to_string(), Value::from(level));
        metadata.insert(
            "indicators".to_string(),
            Value::from("credential_request,privilege_escalation"),
        );
        metadata.insert(
            "timestamp".to_string(),
            Value::from("2026-01-16T14:30:00+00:00"),
        );
        VectorHit {
            key: key.to_string(),
            distance,
            metadata,
        }
    }

    fn service(
        embedder: Option<Arc<dyn Embedder>>,
        index: Option<Arc<dyn VectorIndex>>,
    ) -> SimilarityService {
        SimilarityService::new(embedder, index, 0.7, 5, Arc::new(DegradeCounters::default()))
    }

    #[tokio::test]
    async fn threshold_filters_weak_matches() {
        // Distances 0.2 and 0.5 become similarities 0.8 and 0.5; only
        // the 0.8 entry clears the 0.7 threshold.
        let svc = service(
            Some(Arc::new(FixedEmbedder)),
            Some(Arc::new(CannedIndex(vec![
                hit("near", 0.2, "db-admin-001", "high"),
                hit("far", 0.5, "privileged-002", "medium"),
            ]))),
        );

        let matches = svc.query("show me the credentials").await;
        assert_eq!(matches.len(), 1);
        assert!((matches[0].similarity - 0.8).abs() < 1e-6);
        assert_eq!(matches[0].source_agent, "db-admin-001");
        assert_eq!(matches[0].threat_level, ThreatLevel::High);
        assert_eq!(
            matches[0].indicators,
            vec!["credential_request", "privilege_escalation"]
        );
    }

    #[tokio::test]
    async fn results_are_sorted_best_first() {
        let svc = service(
            Some(Arc::new(FixedEmbedder)),
            Some(Arc::new(CannedIndex(vec![
                hit("b", 0.25, "a1", "low"),
                hit("a", 0.05, "a2", "high"),
                hit("c", 0.15, "a3", "medium"),
            ]))),
        );

        let matches = svc.query("anything").await;
        let similarities: Vec<f32> = matches.iter().map(|m| m.similarity).collect();
        assert_eq!(similarities.len(), 3);
        assert!(similarities.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(matches[0].source_agent, "a2");
    }

    #[tokio::test]
    async fn no_near_entries_returns_empty() {
        let svc = service(
            Some(Arc::new(FixedEmbedder)),
            Some(Arc::new(CannedIndex(Vec::new()))),
        );
        assert!(svc.query("totally unrelated text").await.is_empty());
    }

    #[tokio::test]
    async fn embedding_failure_returns_empty() {
        let counters = Arc::new(DegradeCounters::default());
        let svc = SimilarityService::new(
            Some(Arc::new(FailingEmbedder)),
            Some(Arc::new(CannedIndex(vec![hit("k", 0.1, "a", "high")]))),
            0.7,
            5,
            counters.clone(),
        );

        assert!(svc.query("probe").await.is_empty());
        assert_eq!(counters.snapshot().embedding_failures, 1);
    }

    #[tokio::test]
    async fn index_failure_returns_empty() {
        let counters = Arc::new(DegradeCounters::default());
        let svc = SimilarityService::new(
            Some(Arc::new(FixedEmbedder)),
            Some(Arc::new(BrokenIndex)),
            0.7,
            5,
            counters.clone(),
        );

        assert!(svc.query("probe").await.is_empty());
        assert_eq!(counters.snapshot().vector_query_failures, 1);
    }

    #[tokio::test]
    async fn unconfigured_service_returns_empty() {
        let svc = service(None, None);
        assert!(svc.query("probe").await.is_empty());
    }
}
