//! Routing event buffer
//!
//! Bounded diagnostic record of routing decisions. Carries no
//! correctness requirement: the oldest entries are evicted once the
//! buffer is full, and nothing reads it on the request path.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::identity::{AgentType, Identity};

/// Default buffer capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 100;

/// Snapshot of one routing decision.
#[derive(Debug, Clone, Serialize)]
pub struct RouteEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub rule_name: String,
    pub destination: String,
    pub agent_id: Option<String>,
    pub agent_type: AgentType,
    pub valid: bool,
    pub authorized: bool,
    pub is_honeypot: bool,
}

impl RouteEvent {
    pub fn new(identity: &Identity, rule_name: &str, event_type: &str, destination: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            rule_name: rule_name.to_string(),
            destination: destination.to_string(),
            agent_id: identity.agent_id.clone(),
            agent_type: identity.agent_type,
            valid: identity.valid,
            authorized: identity.authorized,
            is_honeypot: identity.is_honeypot,
        }
    }
}

/// Fixed-capacity ring buffer of [`RouteEvent`]s.
pub struct RouteEventLog {
    inner: Mutex<VecDeque<RouteEvent>>,
    capacity: usize,
}

impl RouteEventLog {
    /// Capacity is clamped to at least one entry; a zero-capacity
    /// buffer would otherwise never hit its eviction point.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, event: RouteEvent) {
        let mut buffer = self.inner.lock();
        while buffer.len() >= self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(event);
    }

    /// Copy of the buffered events, oldest first.
    pub fn snapshot(&self) -> Vec<RouteEvent> {
        self.inner.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl Default for RouteEventLog {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
