//! Routing rule engine
//!
//! Decides which destination an identity reaches. Rules are sorted
//! ascending by priority once at load time; the first rule whose
//! condition matches wins, so rule order encodes precedence (an
//! "invalid token" rule must outrank "authorized and real"). A
//! destination of `"self"` resolves through the caller's trap_profile
//! claim to one of the configured decoys.

pub mod condition;
pub mod events;

pub use condition::{Attr, Condition};
pub use events::{RouteEvent, RouteEventLog, DEFAULT_EVENT_CAPACITY};

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ConfigError;
use crate::identity::Identity;

/// Sentinel destination resolved via the trap_profile claim.
pub const SELF_ROUTE: &str = "self";

/// One routing rule as loaded from configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleSpec {
    #[serde(default)]
    pub name: String,
    pub priority: i32,
    pub condition: String,
    pub route_to: String,
    #[serde(default)]
    pub log_event: Option<String>,
}

/// Full routing configuration. File format and loading are the
/// caller's concern; this type only requires something deserializable
/// into it.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingConfig {
    pub rules: Vec<RuleSpec>,
    pub default_route: String,
    #[serde(default)]
    pub default_log_event: Option<String>,
    /// trap_profile claim value -> decoy destination
    #[serde(default = "default_trap_profiles")]
    pub trap_profiles: HashMap<String, String>,
    /// Decoy used when the claim is absent or unrecognized
    #[serde(default = "default_trap")]
    pub default_trap: String,
}

fn default_trap_profiles() -> HashMap<String, String> {
    HashMap::from([
        ("db-admin".to_string(), "honeypot_db_admin".to_string()),
        ("privileged".to_string(), "honeypot_privileged".to_string()),
    ])
}

fn default_trap() -> String {
    "honeypot_db_admin".to_string()
}

impl Default for RoutingConfig {
    /// Demo rule set: invalid and unauthorized callers land in decoys,
    /// honeypot-typed callers route to themselves, verified real agents
    /// reach the real backend.
    fn default() -> Self {
        Self {
            rules: vec![
                RuleSpec {
                    name: "invalid_token".to_string(),
                    priority: 10,
                    condition: "not valid".to_string(),
                    route_to: "honeypot_db_admin".to_string(),
                    log_event: Some("invalid_token_diverted".to_string()),
                },
                RuleSpec {
                    name: "unauthorized_agent".to_string(),
                    priority: 20,
                    condition: "valid and not authorized".to_string(),
                    route_to: "honeypot_privileged".to_string(),
                    log_event: Some("unauthorized_diverted".to_string()),
                },
                RuleSpec {
                    name: "honeypot_caller".to_string(),
                    priority: 30,
                    condition: "valid and is_honeypot".to_string(),
                    route_to: SELF_ROUTE.to_string(),
                    log_event: None,
                },
                RuleSpec {
                    name: "verified_real".to_string(),
                    priority: 40,
                    condition: "valid and authorized and not is_honeypot".to_string(),
                    route_to: "real".to_string(),
                    log_event: None,
                },
            ],
            default_route: "honeypot_db_admin".to_string(),
            default_log_event: Some("default_diverted".to_string()),
            trap_profiles: default_trap_profiles(),
            default_trap: default_trap(),
        }
    }
}

/// Destination plus a trap flag, for diagnostics and demo surfaces.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RouteInfo {
    pub destination: String,
    pub is_trap: bool,
}

struct CompiledRule {
    name: String,
    priority: i32,
    condition: Condition,
    route_to: String,
    log_event: Option<String>,
}

/// First-match router over compiled rules.
pub struct Router {
    rules: Vec<CompiledRule>,
    default_route: String,
    default_log_event: Option<String>,
    trap_profiles: HashMap<String, String>,
    default_trap: String,
    trap_profile_claim: String,
    events: Arc<RouteEventLog>,
}

impl Router {
    /// Compile and sort the rule set. A malformed condition or empty
    /// destination fails here, before any traffic is served.
    pub fn new(
        config: RoutingConfig,
        claim_namespace: &str,
        events: Arc<RouteEventLog>,
    ) -> Result<Self, ConfigError> {
        let mut rules = Vec::with_capacity(config.rules.len());
        for spec in config.rules {
            if spec.route_to.is_empty() {
                return Err(ConfigError::EmptyDestination(spec.name));
            }
            rules.push(CompiledRule {
                condition: Condition::parse(&spec.condition)?,
                name: spec.name,
                priority: spec.priority,
                route_to: spec.route_to,
                log_event: spec.log_event,
            });
        }
        // Stable sort: rules with equal priority keep their listed order.
        rules.sort_by_key(|rule| rule.priority);

        Ok(Self {
            rules,
            default_route: config.default_route,
            default_log_event: config.default_log_event,
            trap_profiles: config.trap_profiles,
            default_trap: config.default_trap,
            trap_profile_claim: format!("{claim_namespace}trap_profile"),
            events,
        })
    }

    /// Route an identity to a destination key.
    ///
    /// Always returns a destination; with no matching rule the
    /// configured default applies. This path must never error out to
    /// the caller.
    pub fn route(&self, identity: &Identity) -> String {
        for rule in &self.rules {
            if !rule.condition.evaluate(identity) {
                continue;
            }

            let destination = if rule.route_to == SELF_ROUTE {
                self.trap_destination(identity)
            } else {
                rule.route_to.clone()
            };

            if let Some(event_type) = &rule.log_event {
                self.events
                    .push(RouteEvent::new(identity, &rule.name, event_type, &destination));
            }

            tracing::debug!(
                rule = %rule.name,
                priority = rule.priority,
                destination = %destination,
                "routing rule matched"
            );
            return destination;
        }

        if let Some(event_type) = &self.default_log_event {
            self.events
                .push(RouteEvent::new(identity, "default", event_type, &self.default_route));
        }
        tracing::debug!(destination = %self.default_route, "no rule matched, using default route");
        self.default_route.clone()
    }

    /// Destination plus trap flag.
    pub fn route_info(&self, identity: &Identity) -> RouteInfo {
        let destination = self.route(identity);
        let is_trap = destination.starts_with("honeypot");
        RouteInfo { destination, is_trap }
    }

    /// Diagnostic event buffer.
    pub fn events(&self) -> &RouteEventLog {
        &self.events
    }

    /// Pick a decoy for a `"self"` route from the trap_profile claim.
    fn trap_destination(&self, identity: &Identity) -> String {
        identity
            .claim(&self.trap_profile_claim)
            .and_then(Value::as_str)
            .and_then(|profile| self.trap_profiles.get(profile))
            .cloned()
            .unwrap_or_else(|| self.default_trap.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::AgentType;
    use serde_json::Map;

    fn identity(valid: bool, authorized: bool, honeypot: bool) -> Identity {
        Identity {
            valid,
            agent_id: valid.then(|| "agent-001".to_string()),
            agent_type: if honeypot { AgentType::Honeypot } else { AgentType::Real },
            is_honeypot: honeypot,
            authorized: authorized && valid,
            claims: Map::new(),
        }
    }

    fn router(config: RoutingConfig) -> Router {
        Router::new(config, "https://honeygate.io/", Arc::new(RouteEventLog::default()))
            .expect("rule set must compile")
    }

    #[test]
    fn invalid_token_routes_to_decoy() {
        let config = RoutingConfig {
            rules: vec![RuleSpec {
                name: "invalid".to_string(),
                priority: 1,
                condition: "not valid".to_string(),
                route_to: "honeypot_db_admin".to_string(),
                log_event: None,
            }],
            ..RoutingConfig::default()
        };
        assert_eq!(router(config).route(&Identity::invalid()), "honeypot_db_admin");
    }

    #[test]
    fn verified_real_agent_reaches_real_backend() {
        let r = router(RoutingConfig::default());
        assert_eq!(r.route(&identity(true, true, false)), "real");
    }

    #[test]
    fn lowest_priority_match_wins() {
        let config = RoutingConfig {
            rules: vec![
                RuleSpec {
                    name: "late".to_string(),
                    priority: 50,
                    condition: "valid".to_string(),
                    route_to: "late_destination".to_string(),
                    log_event: None,
                },
                RuleSpec {
                    name: "early".to_string(),
                    priority: 5,
                    condition: "valid".to_string(),
                    route_to: "early_destination".to_string(),
                    log_event: None,
                },
            ],
            ..RoutingConfig::default()
        };
        // Both conditions match; the lower priority value is evaluated first.
        assert_eq!(router(config).route(&identity(true, true, false)), "early_destination");
    }

    #[test]
    fn no_match_falls_through_to_default() {
        let config = RoutingConfig {
            rules: vec![RuleSpec {
                name: "honeypots_only".to_string(),
                priority: 1,
                condition: "is_honeypot".to_string(),
                route_to: "self".to_string(),
                log_event: None,
            }],
            default_route: "honeypot_db_admin".to_string(),
            ..RoutingConfig::default()
        };
        assert_eq!(router(config).route(&identity(true, true, false)), "honeypot_db_admin");
    }

    #[test]
    fn self_route_resolves_trap_profile_claim() {
        let r = router(RoutingConfig::default());

        let mut caller = identity(true, true, true);
        caller.claims.insert(
            "https://honeygate.io/trap_profile".to_string(),
            serde_json::Value::from("privileged"),
        );
        assert_eq!(r.route(&caller), "honeypot_privileged");

        // Unrecognized profile falls back to the default trap.
        let mut caller = identity(true, true, true);
        caller.claims.insert(
            "https://honeygate.io/trap_profile".to_string(),
            serde_json::Value::from("nonsense"),
        );
        assert_eq!(r.route(&caller), "honeypot_db_admin");

        // Absent claim behaves the same.
        assert_eq!(r.route(&identity(true, true, true)), "honeypot_db_admin");
    }

    #[test]
    fn unauthorized_agent_is_diverted() {
        let r = router(RoutingConfig::default());
        assert_eq!(r.route(&identity(true, false, false)), "honeypot_privileged");
    }

    #[test]
    fn route_info_flags_traps() {
        let r = router(RoutingConfig::default());
        assert!(r.route_info(&Identity::invalid()).is_trap);
        assert!(!r.route_info(&identity(true, true, false)).is_trap);
    }

    #[test]
    fn matched_rules_emit_events_and_buffer_is_bounded() {
        let events = Arc::new(RouteEventLog::new(2));
        let r = Router::new(RoutingConfig::default(), "https://honeygate.io/", events.clone())
            .expect("rule set must compile");

        for _ in 0..5 {
            r.route(&Identity::invalid());
        }

        let snapshot = events.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].rule_name, "invalid_token");
        assert_eq!(snapshot[0].event_type, "invalid_token_diverted");
        assert!(!snapshot[0].valid);
    }

    #[test]
    fn malformed_rule_fails_at_load() {
        let config = RoutingConfig {
            rules: vec![RuleSpec {
                name: "broken".to_string(),
                priority: 1,
                condition: "valid and and".to_string(),
                route_to: "real".to_string(),
                log_event: None,
            }],
            ..RoutingConfig::default()
        };
        let result = Router::new(config, "ns/", Arc::new(RouteEventLog::default()));
        assert!(result.is_err());
    }
}
