//! Authorization checks
//!
//! Remote relationship check: "may this agent communicate within this
//! scope". The service being unreachable is not an error the caller
//! sees - the configured unavailability policy (fail-open for demos,
//! fail-closed for hardened deployments) decides the outcome.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::GatewayConfig;
use crate::error::AuthzError;
use crate::identity::Identity;
use crate::telemetry::DegradeCounters;

#[derive(Debug, Serialize)]
struct TupleKey {
    user: String,
    relation: String,
    object: String,
}

#[derive(Debug, Serialize)]
struct CheckRequest {
    tuple_key: TupleKey,
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    #[serde(default)]
    allowed: bool,
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    audience: String,
    grant_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Client for the remote relationship-check service.
pub struct AuthzChecker {
    api_url: String,
    token_url: String,
    store_id: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    fail_open: bool,
    http: reqwest::Client,
    counters: Arc<DegradeCounters>,
}

impl AuthzChecker {
    pub fn new(config: &GatewayConfig, counters: Arc<DegradeCounters>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.authz_timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_url: config.authz_api_url.clone(),
            token_url: config.authz_token_url.clone(),
            store_id: config.authz_store_id.clone(),
            client_id: config.authz_client_id.clone(),
            client_secret: config.authz_client_secret.clone(),
            fail_open: config.authz_fail_open,
            http,
            counters,
        }
    }

    /// Run the check and fold the result into the identity.
    ///
    /// Only valid identities are checked; an invalid one stays
    /// unauthorized without a network call.
    pub async fn authorize(&self, identity: &mut Identity, relation: &str, scope: &str) {
        if !identity.valid {
            return;
        }
        identity.authorized = self.check(identity, relation, scope).await;
    }

    /// Check whether the agent holds `relation` on `scope`.
    ///
    /// A single attempt, bounded timeout, no retry: one failed attempt
    /// is enough to apply the unavailability policy.
    pub async fn check(&self, identity: &Identity, relation: &str, scope: &str) -> bool {
        match self.remote_check(identity, relation, scope).await {
            Ok(allowed) => allowed,
            Err(err) => {
                self.counters.record_authz_failure();
                tracing::warn!(
                    "authorization check unavailable ({}), failing {}",
                    err,
                    if self.fail_open { "open" } else { "closed" }
                );
                self.fail_open
            }
        }
    }

    async fn remote_check(
        &self,
        identity: &Identity,
        relation: &str,
        scope: &str,
    ) -> Result<bool, AuthzError> {
        let (store_id, client_id, client_secret) =
            match (&self.store_id, &self.client_id, &self.client_secret) {
                (Some(store), Some(id), Some(secret)) => (store, id, secret),
                _ => return Err(AuthzError::NotConfigured),
            };

        let token = self.fetch_token(client_id, client_secret).await?;

        let agent_id = identity.agent_id.as_deref().unwrap_or_default();
        let url = format!("{}/stores/{}/check", self.api_url, store_id);
        let request = CheckRequest {
            tuple_key: TupleKey {
                user: format!("agent:{agent_id}"),
                relation: relation.to_string(),
                object: scope.to_string(),
            },
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| AuthzError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthzError::Status(response.status().as_u16()));
        }

        let body: CheckResponse = response
            .json()
            .await
            .map_err(|e| AuthzError::Parse(e.to_string()))?;

        Ok(body.allowed)
    }

    /// Client-credentials token for the authorization API.
    async fn fetch_token(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<String, AuthzError> {
        let request = TokenRequest {
            client_id,
            client_secret,
            audience: format!("{}/", self.api_url),
            grant_type: "client_credentials",
        };

        let response = self
            .http
            .post(&self.token_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AuthzError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthzError::Status(response.status().as_u16()));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthzError::Parse(e.to_string()))?;

        Ok(body.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::AgentType;

    fn valid_identity() -> Identity {
        Identity {
            valid: true,
            agent_id: Some("agent-001".to_string()),
            agent_type: AgentType::Real,
            is_honeypot: false,
            authorized: true,
            claims: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn unconfigured_service_fails_open_by_default() {
        let counters = Arc::new(DegradeCounters::default());
        let checker = AuthzChecker::new(&GatewayConfig::default(), counters.clone());

        assert!(checker.check(&valid_identity(), "can_communicate", "swarm:alpha").await);
        assert_eq!(counters.snapshot().authz_failures, 1);
    }

    #[tokio::test]
    async fn unconfigured_service_fails_closed_when_flagged() {
        let config = GatewayConfig {
            authz_fail_open: false,
            ..GatewayConfig::default()
        };
        let checker = AuthzChecker::new(&config, Arc::new(DegradeCounters::default()));

        assert!(!checker.check(&valid_identity(), "can_communicate", "swarm:alpha").await);
    }

    #[tokio::test]
    async fn invalid_identity_is_not_checked() {
        let counters = Arc::new(DegradeCounters::default());
        let checker = AuthzChecker::new(&GatewayConfig::default(), counters.clone());

        let mut identity = Identity::invalid();
        checker.authorize(&mut identity, "can_communicate", "swarm:alpha").await;

        assert!(!identity.authorized);
        // No network attempt, no failure recorded.
        assert_eq!(counters.snapshot().authz_failures, 0);
    }
}
