//! Configuration module

use std::env;
use std::path::PathBuf;

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Token issuer domain (JWKS lives at https://<domain>/.well-known/jwks.json)
    pub auth_domain: Option<String>,

    /// Expected token audience
    pub auth_audience: Option<String>,

    /// Namespace prefix for custom claims (agent_type, trap_profile)
    pub claim_namespace: String,

    /// JWKS cache lifetime in seconds
    pub jwks_ttl_secs: u64,

    /// JWKS fetch timeout in seconds
    pub jwks_timeout_secs: u64,

    /// Authorization (relationship check) API base URL
    pub authz_api_url: String,

    /// OAuth token endpoint for the authorization API
    pub authz_token_url: String,

    /// Authorization store id
    pub authz_store_id: Option<String>,

    /// Authorization client credentials
    pub authz_client_id: Option<String>,
    pub authz_client_secret: Option<String>,

    /// Authorization check timeout in seconds
    pub authz_timeout_secs: u64,

    /// Whether an unreachable authorization service allows the request.
    /// Demo deployments fail open; set false to fail closed.
    pub authz_fail_open: bool,

    /// Embedding provider endpoint (unset = vector path disabled)
    pub embedding_url: Option<String>,

    /// Fixed embedding dimension
    pub embedding_dimension: usize,

    /// Embedding request timeout in seconds
    pub embedding_timeout_secs: u64,

    /// Retries after the first embedding attempt
    pub embedding_max_retries: u32,

    /// Vector index endpoint (unset = vector path disabled)
    pub vector_index_url: Option<String>,

    /// Vector index request timeout in seconds
    pub vector_timeout_secs: u64,

    /// Minimum cosine similarity for a fingerprint match
    pub similarity_threshold: f32,

    /// Nearest neighbors fetched per similarity query
    pub similarity_top_k: usize,

    /// Directory for the append-only fingerprint/attack logs
    pub log_dir: PathBuf,
}

impl GatewayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            auth_domain: env::var("HONEYGATE_AUTH_DOMAIN").ok(),

            auth_audience: env::var("HONEYGATE_AUTH_AUDIENCE").ok(),

            claim_namespace: env::var("HONEYGATE_CLAIM_NAMESPACE")
                .unwrap_or_else(|_| "https://honeygate.io/".to_string()),

            jwks_ttl_secs: env::var("HONEYGATE_JWKS_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(600),

            jwks_timeout_secs: env::var("HONEYGATE_JWKS_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),

            authz_api_url: env::var("HONEYGATE_AUTHZ_API_URL")
                .unwrap_or_else(|_| "https://api.us1.fga.dev".to_string()),

            authz_token_url: env::var("HONEYGATE_AUTHZ_TOKEN_URL")
                .unwrap_or_else(|_| "https://fga.us.auth0.com/oauth/token".to_string()),

            authz_store_id: env::var("HONEYGATE_AUTHZ_STORE_ID").ok(),

            authz_client_id: env::var("HONEYGATE_AUTHZ_CLIENT_ID").ok(),
            authz_client_secret: env::var("HONEYGATE_AUTHZ_CLIENT_SECRET").ok(),

            authz_timeout_secs: env::var("HONEYGATE_AUTHZ_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),

            authz_fail_open: env::var("HONEYGATE_AUTHZ_FAIL_OPEN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),

            embedding_url: env::var("HONEYGATE_EMBEDDING_URL").ok(),

            embedding_dimension: env::var("HONEYGATE_EMBEDDING_DIMENSION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1536),

            embedding_timeout_secs: env::var("HONEYGATE_EMBEDDING_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),

            embedding_max_retries: env::var("HONEYGATE_EMBEDDING_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),

            vector_index_url: env::var("HONEYGATE_VECTOR_INDEX_URL").ok(),

            vector_timeout_secs: env::var("HONEYGATE_VECTOR_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),

            similarity_threshold: env::var("HONEYGATE_SIMILARITY_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.7),

            similarity_top_k: env::var("HONEYGATE_SIMILARITY_TOP_K")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),

            log_dir: env::var("HONEYGATE_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("logs")),
        }
    }

    /// Check if the vector path (embedding + index) is fully configured
    pub fn vector_path_enabled(&self) -> bool {
        self.embedding_url.is_some() && self.vector_index_url.is_some()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            auth_domain: None,
            auth_audience: None,
            claim_namespace: "https://honeygate.io/".to_string(),
            jwks_ttl_secs: 600,
            jwks_timeout_secs: 5,
            authz_api_url: "https://api.us1.fga.dev".to_string(),
            authz_token_url: "https://fga.us.auth0.com/oauth/token".to_string(),
            authz_store_id: None,
            authz_client_id: None,
            authz_client_secret: None,
            authz_timeout_secs: 5,
            authz_fail_open: true,
            embedding_url: None,
            embedding_dimension: 1536,
            embedding_timeout_secs: 10,
            embedding_max_retries: 2,
            vector_index_url: None,
            vector_timeout_secs: 10,
            similarity_threshold: 0.7,
            similarity_top_k: 5,
            log_dir: PathBuf::from("logs"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_demo_safe() {
        let config = GatewayConfig::default();
        assert!(config.authz_fail_open);
        assert_eq!(config.embedding_dimension, 1536);
        assert_eq!(config.similarity_top_k, 5);
        assert!((config.similarity_threshold - 0.7).abs() < f32::EPSILON);
        assert!(!config.vector_path_enabled());
    }
}
