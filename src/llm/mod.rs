//! LLM Gateway Module
//!
//! Wraps a remote chat-completion provider behind a small trait seam so the
//! advisory synthesizer can be exercised against stubs. The concrete
//! [`ChatGateway`] owns call statistics and the operator-triggered health
//! check.
//!
//! ## Failure policy
//!
//! No gateway failure ever crosses this boundary as a fault: every error
//! kind maps to designated fallback text (`advisor::templates`). A single
//! attempt per request, bounded timeouts, no retries — the caller always
//! gets a fast, non-empty answer.

use async_trait::async_trait;
use thiserror::Error;

mod gateway;
pub use gateway::ChatGateway;

/// LLM gateway failure taxonomy. All variants are converted to fallback
/// text at the gateway boundary; none surface to the orchestrator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// No credential configured. Expected, not exceptional — routes
    /// straight to simulation mode without a network attempt.
    #[error("no API credential configured (simulation mode)")]
    ConfigurationMissing,

    /// DNS, connect or timeout failure.
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    /// HTTP 401.
    #[error("authentication rejected by provider")]
    AuthenticationRejected,

    /// HTTP 402 — provider account balance exhausted.
    #[error("provider balance exhausted")]
    QuotaExhausted,

    /// HTTP 429.
    #[error("rate limited by provider")]
    RateLimited,

    /// HTTP 200 with an unparsable or empty body.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    /// Any other non-200 status.
    #[error("provider error: HTTP {status}: {body}")]
    UnknownProviderError { status: u16, body: String },
}

/// Seam between the advisory synthesizer and the concrete provider client.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// One generation attempt. Implementations record their own statistics
    /// and must not retry.
    async fn generate(&self, prompt: &str) -> Result<String, GatewayError>;

    /// Whether a real credential is present.
    fn is_configured(&self) -> bool;

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;
}
