use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ENROLLMENT_API_URL, DEFAULT_IDENTITY_API_URL, DEFAULT_IDENTITY_API_VERSION,
    DEFAULT_USER_AGENT, NAME_SEARCH_LIMIT,
};
use crate::error::ConfigError;

/// Engine tunables. Any field missing from a JSON config keeps its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub identity_api_url: String,
    pub identity_api_version: String,
    pub enrollment_api_url: String,
    /// Upper bound on a single remote request; hitting it counts as a failure.
    pub request_timeout_secs: u64,
    /// Attempts per remote call for retryable statuses and connection errors.
    pub max_attempts: u32,
    pub name_search_limit: usize,
    /// Candidates resolved at once. 1 resolves them strictly in order.
    pub concurrency: usize,
    pub user_agent: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            identity_api_url: DEFAULT_IDENTITY_API_URL.to_string(),
            identity_api_version: DEFAULT_IDENTITY_API_VERSION.to_string(),
            enrollment_api_url: DEFAULT_ENROLLMENT_API_URL.to_string(),
            request_timeout_secs: 10,
            max_attempts: 1,
            name_search_limit: NAME_SEARCH_LIMIT,
            concurrency: 1,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ResolverConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Longest a single registry call may take from the engine's side:
    /// every attempt timing out plus the backoff between attempts.
    pub fn call_deadline(&self) -> Duration {
        let attempts = self.max_attempts.max(1);
        let mut deadline = self.request_timeout() * attempts;
        let mut backoff = Duration::from_secs(1);
        for _ in 1..attempts {
            deadline += backoff;
            backoff = (backoff + backoff).min(Duration::from_secs(60));
        }
        deadline
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.max(1)
    }

    pub fn name_search_limit(&self) -> usize {
        self.name_search_limit.clamp(1, NAME_SEARCH_LIMIT)
    }
}
