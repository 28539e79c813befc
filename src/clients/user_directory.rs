use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::access::Actor;
use crate::domain::order::UserId;
use crate::domain::user::UserInfo;
use crate::metrics::Metrics;
use crate::utils::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError};

// ============================================================================
// User Directory Client
// ============================================================================
//
// Two layers:
// - UserDirectory: raw transport to the remote directory, fails loudly
// - UserDirectoryClient: circuit breaker + fallback around the transport,
//   never fails. Unreachable, erroring or open-circuit lookups all come back
//   as an inactive placeholder.
//
// Callers that need a real user must check `active` themselves.
//
// ============================================================================

pub const ACTOR_ID_HEADER: &str = "X-User-Id";
pub const ACTOR_ROLES_HEADER: &str = "X-User-Roles";

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("User directory request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("User directory returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("User directory returned no user")]
    Empty,
}

impl DirectoryError {
    /// Short label used for metrics and log fields
    pub fn reason(&self) -> &'static str {
        match self {
            DirectoryError::Transport(e) if e.is_timeout() => "timeout",
            DirectoryError::Transport(_) => "transport",
            DirectoryError::Status { .. } => "status",
            DirectoryError::Empty => "empty",
        }
    }
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn fetch_by_id(&self, user_id: UserId, actor: &Actor) -> Result<UserInfo, DirectoryError>;

    async fn fetch_by_email(&self, email: &str, actor: &Actor) -> Result<UserInfo, DirectoryError>;
}

// ============================================================================
// HTTP transport
// ============================================================================

/// Talks to `GET {base}/{id}` and `GET {base}/by-email?email=..`,
/// forwarding the actor headers for downstream authorization
pub struct HttpUserDirectory {
    http: reqwest::Client,
    base_url: String,
}

impl HttpUserDirectory {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn fetch(&self, request: reqwest::RequestBuilder, actor: &Actor) -> Result<UserInfo, DirectoryError> {
        let response = request
            .header(ACTOR_ID_HEADER, actor.id.to_string())
            .header(ACTOR_ROLES_HEADER, actor.roles.to_header())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DirectoryError::Status { status: status.as_u16(), body });
        }
        if status == StatusCode::NO_CONTENT {
            return Err(DirectoryError::Empty);
        }

        Ok(response.json::<UserInfo>().await?)
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn fetch_by_id(&self, user_id: UserId, actor: &Actor) -> Result<UserInfo, DirectoryError> {
        let request = self.http.get(format!("{}/{}", self.base_url, user_id));
        self.fetch(request, actor).await
    }

    async fn fetch_by_email(&self, email: &str, actor: &Actor) -> Result<UserInfo, DirectoryError> {
        let request = self
            .http
            .get(format!("{}/by-email", self.base_url))
            .query(&[("email", email)]);
        self.fetch(request, actor).await
    }
}

// ============================================================================
// Resilient client
// ============================================================================

#[derive(Clone)]
pub struct UserDirectoryClient {
    directory: Arc<dyn UserDirectory>,
    circuit_breaker: CircuitBreaker,
    metrics: Arc<Metrics>,
}

impl UserDirectoryClient {
    pub fn new(directory: Arc<dyn UserDirectory>, config: CircuitBreakerConfig, metrics: Arc<Metrics>) -> Self {
        let circuit_breaker = CircuitBreaker::new("user_directory", config)
            .with_transition_hook(metrics.circuit_breaker_hook());

        Self {
            directory,
            circuit_breaker,
            metrics,
        }
    }

    pub async fn lookup_by_id(&self, user_id: UserId, actor: &Actor) -> UserInfo {
        let result = self
            .circuit_breaker
            .call(self.directory.fetch_by_id(user_id, actor))
            .await;

        self.settle(result, "by_id", UserInfo::placeholder_unavailable).await
    }

    pub async fn lookup_by_email(&self, email: &str, actor: &Actor) -> UserInfo {
        let result = self
            .circuit_breaker
            .call(self.directory.fetch_by_email(email, actor))
            .await;

        self.settle(result, "by_email", || UserInfo::placeholder(email)).await
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    /// Fallback branch: every failure path yields the placeholder
    async fn settle(
        &self,
        result: Result<UserInfo, CircuitBreakerError<DirectoryError>>,
        lookup: &'static str,
        placeholder: impl FnOnce() -> UserInfo,
    ) -> UserInfo {
        self.metrics
            .update_circuit_breaker_failure_rate(self.circuit_breaker.get_failure_rate().await);

        match result {
            Ok(user) => {
                self.metrics.record_directory_lookup(lookup, None);
                user
            }
            Err(CircuitBreakerError::CircuitOpen) => {
                tracing::warn!(lookup, "Circuit breaker open - user directory skipped, using placeholder");
                self.metrics.record_directory_lookup(lookup, Some("circuit_open"));
                placeholder()
            }
            Err(CircuitBreakerError::OperationFailed(e)) => {
                tracing::warn!(lookup, error = %e, "User directory lookup failed, using placeholder");
                self.metrics.record_directory_lookup(lookup, Some(e.reason()));
                placeholder()
            }
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
