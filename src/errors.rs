/*!
 * Error types for the polyroute routing core.
 *
 * This module contains custom error types for the different parts of the
 * routing pipeline, using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

use crate::compliance::ComplianceEvaluation;

/// Errors that can occur when invoking a translation provider
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The call exceeded the provider's target latency
    #[error("Provider call timed out after {0} ms")]
    Timeout(u64),
}

impl ProviderError {
    /// Stable short code for aggregated failure payloads and draft records
    pub fn code(&self) -> &'static str {
        match self {
            Self::RequestFailed(_) => "request_failed",
            Self::ParseError(_) => "parse_error",
            Self::ApiError { .. } => "api_error",
            Self::ConnectionError(_) => "connection_error",
            Self::RateLimitExceeded(_) => "rate_limited",
            Self::AuthenticationError(_) => "auth_error",
            Self::Timeout(_) => "timeout",
        }
    }
}

/// Per-provider failure entry carried by [`RouteError::AllProvidersFailed`]
#[derive(Debug, Clone)]
pub struct ProviderFailure {
    /// Identifier of the provider that failed
    pub provider_id: String,
    /// Stable error code for diagnostics
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl ProviderFailure {
    pub fn new(
        provider_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Errors surfaced by the router and pipeline to the caller.
///
/// Compliance, budget and aggregated provider failures each carry enough
/// structured detail for the caller to display or resolve the condition
/// without re-deriving it.
#[derive(Error, Debug)]
pub enum RouteError {
    /// Request text was empty or whitespace-only; rejected before any
    /// provider contact
    #[error("Translation text is empty")]
    EmptyText,

    /// Request text exceeded the configured maximum length
    #[error("Translation text is too long: {length} chars (max {max})")]
    TextTooLong {
        /// Actual character count
        length: usize,
        /// Configured maximum
        max: usize,
    },

    /// Every candidate provider was blocked by compliance policy
    #[error("Request blocked by compliance policy: {}", .0.violation_summary())]
    ComplianceBlocked(ComplianceEvaluation),

    /// The daily spend ceiling would be exceeded; the charge was not applied
    #[error("Daily translation budget exceeded ({remaining_usd:.4} USD remaining)")]
    BudgetExceeded {
        /// Allowance left in the current accounting window
        remaining_usd: f64,
    },

    /// All providers in the failover chain failed for mixed reasons
    #[error("All translation providers failed ({} attempted)", .0.len())]
    AllProvidersFailed(Vec<ProviderFailure>),

    /// Error from the draft store or another injected collaborator
    #[error("Store error: {0}")]
    Store(String),
}

impl RouteError {
    /// Stable short code used for draft error records and backoff
    /// classification in the replay engine.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyText => "empty_text",
            Self::TextTooLong { .. } => "text_too_long",
            Self::ComplianceBlocked(_) => "compliance_blocked",
            Self::BudgetExceeded { .. } => "budget_exceeded",
            Self::AllProvidersFailed(_) => "all_providers_failed",
            Self::Store(_) => "store_error",
        }
    }

    /// Whether a draft that failed with this error is worth retrying later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ComplianceBlocked(_)
                | Self::BudgetExceeded { .. }
                | Self::AllProvidersFailed(_)
                | Self::Store(_)
        )
    }
}

impl From<anyhow::Error> for RouteError {
    fn from(error: anyhow::Error) -> Self {
        Self::Store(error.to_string())
    }
}
