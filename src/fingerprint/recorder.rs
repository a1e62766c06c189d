//! Fingerprint recorder
//!
//! Records one decoy interaction: always appends to the local log,
//! then best-effort embeds the message and upserts it into the vector
//! index. Nothing on this path can fail the caller - the ack reports
//! success even when both stores degrade.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::fingerprint::{AppendLog, RecordAck, ThreatFingerprint, ThreatLevel};
use crate::telemetry::DegradeCounters;
use crate::vector::{Embedder, VectorIndex, VectorRecord};

/// Metadata cap for `source_agent` (characters).
const SOURCE_AGENT_MAX: usize = 64;

/// Metadata cap for the compact indicator encoding (characters).
const INDICATORS_MAX: usize = 512;

/// Records decoy interactions durably and into the vector index.
pub struct FingerprintRecorder {
    log: Arc<AppendLog>,
    embedder: Option<Arc<dyn Embedder>>,
    index: Option<Arc<dyn VectorIndex>>,
    counters: Arc<DegradeCounters>,
}

impl FingerprintRecorder {
    pub fn new(
        log: Arc<AppendLog>,
        embedder: Option<Arc<dyn Embedder>>,
        index: Option<Arc<dyn VectorIndex>>,
        counters: Arc<DegradeCounters>,
    ) -> Self {
        Self {
            log,
            embedder,
            index,
            counters,
        }
    }

    /// Record an interaction. Infallible from the caller's view.
    pub async fn record(
        &self,
        source_agent: &str,
        message: &str,
        indicators: &[String],
        session_id: &str,
    ) -> RecordAck {
        let fingerprint = ThreatFingerprint {
            timestamp: Utc::now(),
            source_agent: source_agent.to_string(),
            message: message.to_string(),
            threat_indicators: indicators.to_vec(),
            session_id: session_id.to_string(),
        };
        let threat_level = fingerprint.threat_level();

        // The local log is authoritative; failures are counted inside.
        self.log.append(&fingerprint);

        let vector_stored = self.store_vector(&fingerprint, threat_level).await;

        RecordAck {
            threat_level,
            vector_stored,
        }
    }

    /// Best-effort secondary index write. Any failure aborts silently
    /// after bumping the matching counter.
    async fn store_vector(&self, fingerprint: &ThreatFingerprint, level: ThreatLevel) -> bool {
        let (Some(embedder), Some(index)) = (&self.embedder, &self.index) else {
            return false;
        };

        let vector = match embedder.embed(&fingerprint.message).await {
            Ok(vector) => vector,
            Err(err) => {
                self.counters.record_embedding_failure();
                tracing::warn!("embedding unavailable, fingerprint kept local only: {}", err);
                return false;
            }
        };

        let record = VectorRecord {
            key: Uuid::new_v4().to_string(),
            vector,
            metadata: build_metadata(fingerprint, level),
        };

        match index.upsert(record).await {
            Ok(()) => true,
            Err(err) => {
                self.counters.record_vector_upsert_failure();
                tracing::warn!("vector upsert failed, fingerprint kept local only: {}", err);
                false
            }
        }
    }
}

/// Metadata stays well under the 2KB store limit by construction:
/// the message itself is never included.
fn build_metadata(fingerprint: &ThreatFingerprint, level: ThreatLevel) -> Map<String, Value> {
    let source_agent: String = fingerprint.source_agent.chars().take(SOURCE_AGENT_MAX).collect();

    let mut indicators = fingerprint.threat_indicators.join(",");
    if indicators.chars().count() > INDICATORS_MAX {
        indicators = indicators.chars().take(INDICATORS_MAX).collect();
    }

    let mut metadata = Map::new();
    metadata.insert("source_agent".to_string(), Value::from(source_agent));
    metadata.insert("threat_level".to_string(), Value::from(level.as_str()));
    metadata.insert(
        "timestamp".to_string(),
        Value::from(fingerprint.timestamp.to_rfc3339()),
    );
    metadata.insert("indicators".to_string(), Value::from(indicators));
    metadata
}
