//! Threat fingerprints
//!
//! A fingerprint is a durable record of one decoy interaction. The
//! append-only JSONL log is the authoritative store; the vector index
//! is a best-effort secondary used for similarity search.

pub mod log;
pub mod query;
pub mod recorder;
pub mod session;

pub use log::AppendLog;
pub use query::SimilarityService;
pub use recorder::FingerprintRecorder;
pub use session::session_context;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Indicators tied to credential, privilege, or exfiltration activity.
static HIGH_RISK_INDICATORS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "credential_request",
        "credential_theft",
        "credential_harvesting",
        "privilege_escalation",
        "data_exfiltration",
        "lateral_movement",
    ])
});

/// Indicators tied to reconnaissance and probing.
static MEDIUM_RISK_INDICATORS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "reconnaissance",
        "recon",
        "probing",
        "internal_probing",
        "enumeration",
        "social_engineering",
    ])
});

/// Derived severity of a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Unknown,
    Low,
    Medium,
    High,
}

impl ThreatLevel {
    /// High-risk indicators dominate, then medium-risk; any other
    /// indicator is low; no indicators at all is unknown.
    pub fn from_indicators(indicators: &[String]) -> Self {
        if indicators
            .iter()
            .any(|i| HIGH_RISK_INDICATORS.contains(i.as_str()))
        {
            ThreatLevel::High
        } else if indicators
            .iter()
            .any(|i| MEDIUM_RISK_INDICATORS.contains(i.as_str()))
        {
            ThreatLevel::Medium
        } else if !indicators.is_empty() {
            ThreatLevel::Low
        } else {
            ThreatLevel::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::Unknown => "unknown",
            ThreatLevel::Low => "low",
            ThreatLevel::Medium => "medium",
            ThreatLevel::High => "high",
        }
    }

    /// Case-insensitive parse, for metadata coming back from the
    /// vector index (older records stored uppercase levels).
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "low" => ThreatLevel::Low,
            "medium" => ThreatLevel::Medium,
            "high" => ThreatLevel::High,
            _ => ThreatLevel::Unknown,
        }
    }
}

/// One decoy interaction, as persisted to the fingerprint log.
/// Append-only: never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatFingerprint {
    pub timestamp: DateTime<Utc>,
    pub source_agent: String,
    pub message: String,
    pub threat_indicators: Vec<String>,
    #[serde(default)]
    pub session_id: String,
}

impl ThreatFingerprint {
    pub fn threat_level(&self) -> ThreatLevel {
        ThreatLevel::from_indicators(&self.threat_indicators)
    }
}

/// Attacker-side event stream (recon phases, tactics). Shares the
/// JSONL machinery with fingerprints but lives in its own file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub tactic: String,
    pub phase: String,
    pub target_agent: String,
    #[serde(default)]
    pub session_id: String,
}

impl AttackEvent {
    pub fn new(
        message: &str,
        tactic: &str,
        phase: &str,
        target_agent: &str,
        session_id: &str,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            kind: "attack".to_string(),
            message: message.to_string(),
            tactic: tactic.to_string(),
            phase: phase.to_string(),
            target_agent: target_agent.to_string(),
            session_id: session_id.to_string(),
        }
    }
}

/// Ephemeral result of a similarity query.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarityMatch {
    pub similarity: f32,
    pub source_agent: String,
    pub threat_level: ThreatLevel,
    pub indicators: Vec<String>,
    pub timestamp: String,
}

/// Acknowledgement of a recorded fingerprint. Recording always
/// succeeds from the caller's point of view; `vector_stored` only says
/// whether the secondary index got a copy.
#[derive(Debug, Clone, Serialize)]
pub struct RecordAck {
    pub threat_level: ThreatLevel,
    pub vector_stored: bool,
}
