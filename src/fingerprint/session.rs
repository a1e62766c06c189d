//! Session correlation
//!
//! Builds the context a decoy sees before answering a repeat visitor:
//! what the same session already tried against other decoys. Reads the
//! authoritative fingerprint log, not the vector index, so correlation
//! works even when the embedding path is down.

use crate::fingerprint::{AppendLog, ThreatFingerprint};

/// Header line for injected session context.
pub const CONTEXT_HEADER: &str = "[COORDINATION INTEL - Prior attacker actions this session:]";

/// Message excerpt length in the rendered summary.
const MESSAGE_EXCERPT: usize = 100;

/// Render prior fingerprints for `session_id`, most recent first,
/// truncated to `limit` entries. Empty string when the session id is
/// empty or nothing matches.
pub fn session_context(log: &AppendLog, session_id: &str, limit: usize) -> String {
    if session_id.is_empty() || limit == 0 {
        return String::new();
    }

    let matching: Vec<ThreatFingerprint> = log
        .entries::<ThreatFingerprint>()
        .into_iter()
        .filter(|entry| entry.session_id == session_id)
        .collect();

    if matching.is_empty() {
        return String::new();
    }

    let mut parts = vec![CONTEXT_HEADER.to_string()];
    for entry in matching.iter().rev().take(limit) {
        let excerpt: String = entry.message.chars().take(MESSAGE_EXCERPT).collect();
        let indicators = entry.threat_indicators.join(", ");
        parts.push(format!(
            "- To {}: \"{}...\" [Indicators: {}]",
            entry.source_agent, excerpt, indicators
        ));
    }

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::DegradeCounters;
    use chrono::Utc;
    use std::sync::Arc;

    fn log_with(entries: &[(&str, &str, &str)]) -> (tempfile::TempDir, AppendLog) {
        let dir = tempfile::tempdir().unwrap();
        let log = AppendLog::new(
            dir.path().join("fingerprints.jsonl"),
            Arc::new(DegradeCounters::default()),
        );
        for (session, agent, message) in entries {
            log.append(&ThreatFingerprint {
                timestamp: Utc::now(),
                source_agent: agent.to_string(),
                message: message.to_string(),
                threat_indicators: vec!["probing".to_string()],
                session_id: session.to_string(),
            });
        }
        (dir, log)
    }

    #[test]
    fn returns_only_matching_session_most_recent_first() {
        let (_dir, log) = log_with(&[
            ("s1", "db-admin-001", "first probe"),
            ("s2", "privileged-002", "other session"),
            ("s1", "privileged-002", "second probe"),
            ("s1", "db-admin-001", "third probe"),
        ]);

        let context = session_context(&log, "s1", 2);
        let lines: Vec<&str> = context.lines().collect();

        assert_eq!(lines[0], CONTEXT_HEADER);
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("third probe"));
        assert!(lines[2].contains("second probe"));
        assert!(!context.contains("other session"));
        assert!(!context.contains("first probe"));
    }

    #[test]
    fn cross_decoy_probes_share_one_session() {
        let (_dir, log) = log_with(&[
            ("s1", "db-admin-001", "asked for credentials"),
            ("s1", "privileged-002", "asked for access"),
        ]);

        let context = session_context(&log, "s1", 5);
        assert!(context.contains("To db-admin-001"));
        assert!(context.contains("To privileged-002"));
        assert!(context.contains("[Indicators: probing]"));
    }

    #[test]
    fn empty_session_id_yields_empty_context() {
        let (_dir, log) = log_with(&[("s1", "db-admin-001", "probe")]);
        assert_eq!(session_context(&log, "", 5), "");
    }

    #[test]
    fn unknown_session_yields_empty_context() {
        let (_dir, log) = log_with(&[("s1", "db-admin-001", "probe")]);
        assert_eq!(session_context(&log, "missing", 5), "");
    }

    #[test]
    fn long_messages_are_excerpted() {
        let long = "x".repeat(500);
        let (_dir, log) = log_with(&[("s1", "db-admin-001", long.as_str())]);

        let context = session_context(&log, "s1", 5);
        let line = context.lines().nth(1).unwrap();
        assert!(line.contains(&"x".repeat(100)));
        assert!(!line.contains(&"x".repeat(101)));
    }
}
