//! Tracing setup and degradation counters
//!
//! The gateway never propagates a failure to the caller, so degraded
//! paths (embedding down, vector index timing out, log write failing)
//! are tracked here instead of being silently swallowed.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing with env-filter support.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "honeygate=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Counters for degraded-but-not-fatal paths.
#[derive(Debug, Default)]
pub struct DegradeCounters {
    embedding_failures: AtomicU64,
    vector_upsert_failures: AtomicU64,
    vector_query_failures: AtomicU64,
    log_write_failures: AtomicU64,
    authz_failures: AtomicU64,
}

/// Point-in-time snapshot of the degradation counters.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct DegradeSnapshot {
    pub embedding_failures: u64,
    pub vector_upsert_failures: u64,
    pub vector_query_failures: u64,
    pub log_write_failures: u64,
    pub authz_failures: u64,
}

impl DegradeCounters {
    pub fn record_embedding_failure(&self) {
        self.embedding_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_vector_upsert_failure(&self) {
        self.vector_upsert_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_vector_query_failure(&self) {
        self.vector_query_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_log_write_failure(&self) {
        self.log_write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_authz_failure(&self) {
        self.authz_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DegradeSnapshot {
        DegradeSnapshot {
            embedding_failures: self.embedding_failures.load(Ordering::Relaxed),
            vector_upsert_failures: self.vector_upsert_failures.load(Ordering::Relaxed),
            vector_query_failures: self.vector_query_failures.load(Ordering::Relaxed),
            log_write_failures: self.log_write_failures.load(Ordering::Relaxed),
            authz_failures: self.authz_failures.load(Ordering::Relaxed),
        }
    }
}
