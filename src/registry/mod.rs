//! Remote registry clients.
//!
//! Both registries are reached through a trait so the engine can be driven
//! by in-process fakes. The HTTP implementations turn every network,
//! timeout, status, or body problem into [`Lookup::Unavailable`].

pub mod nppes;
pub mod pecos;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::ResolverConfig;
use crate::error::TransportError;
use crate::model::{EnrollmentStatus, IdentityRecord, Lookup};
use crate::normalize::{Identifier, NameQuery};

pub use nppes::NppesClient;
pub use pecos::PecosClient;

/// One hit from a registry name search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryMatch {
    pub identifier: Identifier,
    pub record: IdentityRecord,
}

#[async_trait]
pub trait IdentityRegistry: Send + Sync {
    /// First registry entry for `id`.
    async fn lookup(&self, id: &Identifier) -> Lookup<IdentityRecord>;

    /// Up to `limit` entries matching the name, in registry order.
    async fn search_by_name(&self, name: &NameQuery, limit: usize) -> Lookup<Vec<RegistryMatch>>;
}

#[async_trait]
pub trait EnrollmentRegistry: Send + Sync {
    async fn lookup(&self, id: &Identifier) -> Lookup<EnrollmentStatus>;
}

/// Registries return identifiers both as JSON numbers and strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RegistryNumber {
    Number(u64),
    Text(String),
}

impl RegistryNumber {
    pub(crate) fn to_identifier(&self) -> Option<Identifier> {
        let raw = match self {
            RegistryNumber::Number(n) => n.to_string(),
            RegistryNumber::Text(s) => s.clone(),
        };
        Identifier::parse(&raw).ok()
    }
}

/// HTTP plumbing shared by both registry clients.
#[derive(Debug, Clone)]
pub struct RegistryHttp {
    client: Client,
    max_attempts: u32,
    timeout: Duration,
}

impl RegistryHttp {
    pub fn new(config: &ResolverConfig) -> Result<Self, reqwest::Error> {
        let timeout = config.request_timeout();
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            max_attempts: config.max_attempts.max(1),
            timeout,
        })
    }

    /// GET `url` and decode the JSON body, retrying retryable statuses and
    /// connection errors up to `max_attempts` times.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        registry: &'static str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, TransportError> {
        let attempts = self.max_attempts;
        let mut backoff = Duration::from_secs(1);

        for attempt in 1..=attempts {
            let response = self.client.get(url).query(query).send().await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp.json::<T>().await.map_err(|err| {
                            if err.is_timeout() {
                                TransportError::Timeout {
                                    registry,
                                    timeout: self.timeout,
                                }
                            } else {
                                TransportError::Decode {
                                    registry,
                                    message: err.to_string(),
                                }
                            }
                        });
                    }

                    let retry_after = parse_retry_after(resp.headers().get(RETRY_AFTER));
                    let body = resp.text().await.unwrap_or_default();
                    if is_retryable_status(status) && attempt < attempts {
                        tracing::debug!(
                            "{registry} returned {status} (attempt {attempt}/{attempts}); retrying"
                        );
                        tokio::time::sleep(retry_after.unwrap_or(backoff)).await;
                        backoff = (backoff + backoff).min(Duration::from_secs(60));
                        continue;
                    }
                    return Err(TransportError::Status {
                        registry,
                        status: status.as_u16(),
                        body: truncate_for_log(&body),
                    });
                }
                Err(err) => {
                    if attempt < attempts && !err.is_timeout() {
                        tracing::debug!(
                            "{registry} request failed (attempt {attempt}/{attempts}): {err}"
                        );
                        tokio::time::sleep(backoff).await;
                        backoff = (backoff + backoff).min(Duration::from_secs(60));
                        continue;
                    }
                    if err.is_timeout() {
                        return Err(TransportError::Timeout {
                            registry,
                            timeout: self.timeout,
                        });
                    }
                    return Err(TransportError::Request {
                        registry,
                        message: err.to_string(),
                    });
                }
            }
        }

        Err(TransportError::Request {
            registry,
            message: "no attempts were made".to_string(),
        })
    }
}

pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

pub fn parse_retry_after(value: Option<&HeaderValue>) -> Option<Duration> {
    let value = value?.to_str().ok()?.trim();
    let secs = value.parse::<u64>().ok()?;
    Some(Duration::from_secs(secs))
}

pub fn truncate_for_log(text: &str) -> String {
    let trimmed = text.trim();
    let max_len = 300usize;
    if trimmed.len() <= max_len {
        return trimmed.to_string();
    }
    let mut cut = max_len;
    while !trimmed.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &trimmed[..cut])
}
