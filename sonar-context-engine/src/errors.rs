//! Crate-wide error hierarchy for sonar-context-engine.

use std::time::Duration;

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type SonarContextResult<T> = Result<T, SonarContextError>;

/// Root error type for the sonar-context-engine crate.
///
/// Everything here is fatal for the request that produced it. Failures that
/// only affect one issue's source context never become a `SonarContextError`;
/// they are carried as [`crate::fetcher::FetchFailure`] instead.
#[derive(Debug, Error)]
pub enum SonarContextError {
    /// Configuration problems (missing token, bad base URL, bad numbers).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Input validation errors (blank project key, partial GitHub coordinates).
    #[error("validation error: {0}")]
    Validation(String),

    /// Upstream answered with a non-2xx status.
    #[error("upstream returned status {status}")]
    Upstream {
        /// HTTP status code returned by the backend.
        status: u16,
        /// Raw response body, passed through to callers as detail.
        body: String,
    },

    /// Network/transport failure without HTTP status (DNS/connect/reset).
    #[error("transport error: {0}")]
    Transport(String),

    /// Timeout at transport level.
    #[error("upstream call timed out")]
    Timeout,

    /// Unexpected/invalid shape of an upstream response.
    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),

    /// Resolution or listing yielded nothing to work with.
    #[error("{0}")]
    NotFound(NotFoundKind),

    /// The caller-facing request budget elapsed.
    #[error("request timed out after {0:?}")]
    RequestTimeout(Duration),
}

impl SonarContextError {
    /// Whether a source fetch that failed with this error deserves a retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Upstream { .. } | Self::Transport(_))
    }
}

/// What could not be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundKind {
    /// No explicit PR, no open PR, no PR-tagged recent issue.
    PullRequest,
    /// The PR exists but carries no issues.
    Issues,
}

impl std::fmt::Display for NotFoundKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PullRequest => f.write_str("No pull request found"),
            Self::Issues => f.write_str("No issues found"),
        }
    }
}

/// Configuration and setup errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing or empty.
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// A number failed to parse (timeouts, page sizes, limits).
    #[error("invalid number in {var}: {reason}")]
    InvalidNumber {
        /// Variable name (e.g., `SONAR_PAGE_SIZE`).
        var: &'static str,
        /// Human-readable reason (e.g., `expected u64`).
        reason: &'static str,
    },

    /// Value had the wrong format (e.g., invalid URL or unknown enum value).
    #[error("invalid format in {var}: {reason}")]
    InvalidFormat {
        /// Variable name (e.g., `SONAR_API_BASE_URL`).
        var: &'static str,
        /// Explanation (e.g., `must start with http:// or https://`).
        reason: &'static str,
    },

    /// The shared HTTP client could not be built.
    #[error("http client setup failed: {0}")]
    HttpClient(String),
}

// ===== Mapping from reqwest::Error =====

impl From<reqwest::Error> for SonarContextError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return SonarContextError::Timeout;
        }

        if let Some(status) = e.status() {
            return SonarContextError::Upstream {
                status: status.as_u16(),
                body: String::new(),
            };
        }

        if e.is_decode() {
            return SonarContextError::InvalidResponse(e.to_string());
        }

        SonarContextError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for SonarContextError {
    fn from(e: serde_json::Error) -> Self {
        SonarContextError::InvalidResponse(e.to_string())
    }
}
