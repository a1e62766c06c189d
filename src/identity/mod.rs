//! Identity layer
//!
//! Token validation, claim extraction, and remote authorization checks.
//! Every inbound request is reduced to an [`Identity`] that the routing
//! engine can evaluate without touching the network again.

pub mod authz;
pub mod verifier;

pub use authz::AuthzChecker;
pub use verifier::TokenVerifier;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Declared type of the calling agent, from the namespaced
/// `agent_type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Real,
    Honeypot,
    Unknown,
}

impl AgentType {
    pub fn parse(value: &str) -> Self {
        match value {
            "real" => AgentType::Real,
            "honeypot" => AgentType::Honeypot,
            _ => AgentType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Real => "real",
            AgentType::Honeypot => "honeypot",
            AgentType::Unknown => "unknown",
        }
    }
}

/// Result of identity validation.
///
/// Created per-request by the [`TokenVerifier`], mutated once by the
/// [`AuthzChecker`], read-only afterwards. Invariants: an invalid
/// identity is never authorized, and `agent_id` is present iff the
/// token verified.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub valid: bool,
    pub agent_id: Option<String>,
    pub agent_type: AgentType,
    pub is_honeypot: bool,
    pub authorized: bool,
    #[serde(skip)]
    pub claims: Map<String, Value>,
}

impl Identity {
    /// The fallback for every verification failure. Callers cannot
    /// distinguish a missing header from a bad signature.
    pub fn invalid() -> Self {
        Self {
            valid: false,
            agent_id: None,
            agent_type: AgentType::Unknown,
            is_honeypot: false,
            authorized: false,
            claims: Map::new(),
        }
    }

    /// Look up a raw claim by full (namespaced) name.
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }
}
