//! HoneyGate - agent-to-agent deception gateway
//!
//! Decides, for every inbound agent request, whether the caller
//! reaches a real backend agent or is silently diverted to a decoy,
//! and records decoy interactions so later probes from the same actor
//! can be recognized.
//!
//! # Architecture
//!
//! ```text
//! request ──▶ TokenVerifier ──▶ Identity ──▶ AuthzChecker ──▶ Router ──▶ destination
//!                                                                          │
//!                              decoy interactions                          ▼
//!             FingerprintRecorder ──▶ JSONL log (authoritative)      (agent executor,
//!                       │                    ▲                         external)
//!                       └─▶ vector index ────┘ rebuildable
//!                            (best-effort)
//!             SimilarityService / session_context: read paths for decoys
//! ```
//!
//! Nothing in this crate propagates a failure to the caller: invalid
//! tokens become invalid identities, unavailable collaborators degrade
//! their own path, and the degradation counters keep operators honest.

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod identity;
pub mod routing;
pub mod telemetry;
pub mod vector;

pub use config::GatewayConfig;
pub use error::{AuthzError, ConfigError, EmbeddingError, VectorError};
pub use fingerprint::{
    session_context, AppendLog, AttackEvent, FingerprintRecorder, RecordAck, SimilarityMatch,
    SimilarityService, ThreatFingerprint, ThreatLevel,
};
pub use identity::{AgentType, AuthzChecker, Identity, TokenVerifier};
pub use routing::{RouteEvent, RouteEventLog, RouteInfo, Router, RoutingConfig, RuleSpec};
pub use telemetry::{DegradeCounters, DegradeSnapshot};

use std::sync::Arc;
use std::time::Duration;

use fingerprint::log::{ATTACK_LOG, FINGERPRINT_LOG};
use vector::{Embedder, HttpEmbedder, HttpVectorIndex, VectorIndex};

/// Relation checked for agent-to-agent traffic.
pub const COMMUNICATE_RELATION: &str = "can_communicate";

/// Outcome of one dispatch decision.
#[derive(Debug, Clone)]
pub struct RouteDecision {
    pub identity: Identity,
    pub destination: String,
    pub is_trap: bool,
}

/// Wires the verification, authorization, routing, and fingerprint
/// components together. HTTP wiring around it is the embedder's
/// concern; this type is the whole decision engine.
pub struct Gateway {
    verifier: TokenVerifier,
    authz: AuthzChecker,
    router: Router,
    recorder: FingerprintRecorder,
    similarity: SimilarityService,
    fingerprint_log: Arc<AppendLog>,
    attack_log: AppendLog,
    counters: Arc<DegradeCounters>,
}

impl Gateway {
    /// Build a gateway. Fails only on configuration errors (malformed
    /// routing rules); missing collaborators merely disable their path.
    pub fn new(config: GatewayConfig, routing: RoutingConfig) -> Result<Self, ConfigError> {
        let counters = Arc::new(DegradeCounters::default());

        let verifier = TokenVerifier::new(&config);
        let authz = AuthzChecker::new(&config, counters.clone());

        let events = Arc::new(RouteEventLog::default());
        let router = Router::new(routing, &config.claim_namespace, events)?;

        let fingerprint_log = Arc::new(AppendLog::new(
            config.log_dir.join(FINGERPRINT_LOG),
            counters.clone(),
        ));
        let attack_log = AppendLog::new(config.log_dir.join(ATTACK_LOG), counters.clone());

        let embedder: Option<Arc<dyn Embedder>> = config.embedding_url.as_ref().map(|url| {
            Arc::new(HttpEmbedder::new(
                url.clone(),
                config.embedding_dimension,
                Duration::from_secs(config.embedding_timeout_secs),
                config.embedding_max_retries,
            )) as Arc<dyn Embedder>
        });
        let index: Option<Arc<dyn VectorIndex>> = config.vector_index_url.as_ref().map(|url| {
            Arc::new(HttpVectorIndex::new(
                url.clone(),
                Duration::from_secs(config.vector_timeout_secs),
            )) as Arc<dyn VectorIndex>
        });

        let recorder = FingerprintRecorder::new(
            fingerprint_log.clone(),
            embedder.clone(),
            index.clone(),
            counters.clone(),
        );
        let similarity = SimilarityService::new(
            embedder,
            index,
            config.similarity_threshold,
            config.similarity_top_k,
            counters.clone(),
        );

        Ok(Self {
            verifier,
            authz,
            router,
            recorder,
            similarity,
            fingerprint_log,
            attack_log,
            counters,
        })
    }

    /// Full decision path for one request: verify, authorize, route.
    /// Always yields a destination.
    pub async fn dispatch(&self, auth_header: Option<&str>, scope: &str) -> RouteDecision {
        let mut identity = self.verifier.verify(auth_header).await;
        self.authz
            .authorize(&mut identity, COMMUNICATE_RELATION, scope)
            .await;

        let info = self.router.route_info(&identity);
        RouteDecision {
            identity,
            destination: info.destination,
            is_trap: info.is_trap,
        }
    }

    /// Record a decoy interaction.
    pub async fn record_fingerprint(
        &self,
        source_agent: &str,
        message: &str,
        indicators: &[String],
        session_id: &str,
    ) -> RecordAck {
        self.recorder
            .record(source_agent, message, indicators, session_id)
            .await
    }

    /// Find stored fingerprints similar to `text`.
    pub async fn similar_fingerprints(&self, text: &str) -> Vec<SimilarityMatch> {
        self.similarity.query(text).await
    }

    /// Prior-interaction summary for a session, for injection into the
    /// external agent executor.
    pub fn session_context(&self, session_id: &str, limit: usize) -> String {
        session_context(&self.fingerprint_log, session_id, limit)
    }

    /// Record an attacker-side event (tactic/phase timeline).
    pub fn log_attack(
        &self,
        message: &str,
        tactic: &str,
        phase: &str,
        target_agent: &str,
        session_id: &str,
    ) -> bool {
        self.attack_log
            .append(&AttackEvent::new(message, tactic, phase, target_agent, session_id))
    }

    /// Routing diagnostics buffer.
    pub fn routing_events(&self) -> &RouteEventLog {
        self.router.events()
    }

    /// Degradation counter snapshot.
    pub fn degrade_snapshot(&self) -> DegradeSnapshot {
        self.counters.snapshot()
    }
}
