//! Engine configuration loaded from environment variables.
//!
//! The configuration is an explicit value: it is read once at startup and
//! handed to every component that needs it. Nothing in the pipeline reads
//! the process environment on its own.
//!
//! # Environment variables
//!
//! Sonar:
//! - `SONAR_TOKEN`               = bearer credential (checked on first use)
//! - `SONAR_API_BASE_URL`        = API base, default `https://sonarcloud.io/api`
//! - `SONAR_PAGE_SIZE`           = issues per page, clamped to `100..=500`
//! - `SONAR_CONTEXT_LINES`       = lines of context above/below an issue
//! - `SONAR_FILE_TIMEOUT_MS`     = sub-timeout for one file fetch
//! - `SONAR_REQUEST_TIMEOUT_MS`  = caller-facing budget for a whole request
//! - `SONAR_FETCH_CONCURRENCY`   = parallel file fetches, clamped to `1..=16`
//! - `SONAR_RETRY_BACKOFF_MS`    = pause before the single fetch retry
//! - `SONAR_SOURCE_ENDPOINT`     = `raw` | `lines` | `show`
//! - `SONAR_SOURCE_KEY_PARAM`    = component parameter name of the source endpoint
//! - `SONAR_PR_PARAM`            = `pullRequest` | `branch`
//!
//! GitHub (optional alternate source path):
//! - `GITHUB_TOKEN`
//! - `GITHUB_API_BASE_URL`       = default `https://api.github.com`

use std::time::Duration;

use crate::errors::{ConfigError, SonarContextResult};

pub const DEFAULT_SONAR_API_BASE_URL: &str = "https://sonarcloud.io/api";
pub const DEFAULT_GITHUB_API_BASE_URL: &str = "https://api.github.com";

pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const MIN_PAGE_SIZE: u32 = 100;
pub const MAX_PAGE_SIZE: u32 = 500;
pub const DEFAULT_CONTEXT_LINES: u32 = 25;
pub const DEFAULT_FETCH_CONCURRENCY: usize = 6;
pub const MAX_FETCH_CONCURRENCY: usize = 16;

/// Which Sonar endpoint serves file contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEndpoint {
    /// `sources/raw`: plain text body.
    Raw,
    /// `sources/lines`: `{sources:[{line, code}]}`.
    Lines,
    /// `sources/show`: `{sources:[[line, code]]}`.
    Show,
}

impl SourceEndpoint {
    pub fn path(self) -> &'static str {
        match self {
            Self::Raw => "sources/raw",
            Self::Lines => "sources/lines",
            Self::Show => "sources/show",
        }
    }

    fn parse(var: &'static str, value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            "lines" => Ok(Self::Lines),
            "show" => Ok(Self::Show),
            _ => Err(ConfigError::InvalidFormat {
                var,
                reason: "expected one of raw, lines, show",
            }),
        }
    }
}

/// How the PR identifier is passed to Sonar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrParam {
    /// Numeric pull request key (`pullRequest=42`).
    PullRequest,
    /// Branch name (`branch=feature/x`).
    Branch,
}

impl PrParam {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PullRequest => "pullRequest",
            Self::Branch => "branch",
        }
    }

    fn parse(var: &'static str, value: &str) -> Result<Self, ConfigError> {
        match value.trim() {
            "pullRequest" | "pull_request" | "pr" => Ok(Self::PullRequest),
            "branch" => Ok(Self::Branch),
            _ => Err(ConfigError::InvalidFormat {
                var,
                reason: "expected pullRequest or branch",
            }),
        }
    }
}

/// Credentials and base URL for the source-hosting API.
#[derive(Clone)]
pub struct GitHubConfig {
    pub base_url: String,
    pub token: String,
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Runtime configuration for the whole pipeline.
#[derive(Clone)]
pub struct EngineConfig {
    /// Sonar bearer token. `None` is accepted at load time and reported as a
    /// [`ConfigError::MissingVar`] when a client is built from it.
    pub credential: Option<String>,
    /// API base, e.g. "https://sonarcloud.io/api".
    pub base_url: String,
    pub page_size: u32,
    pub context_lines: u32,
    pub per_file_timeout: Duration,
    pub request_timeout: Duration,
    pub fetch_concurrency: usize,
    pub retry_backoff: Duration,
    pub source_endpoint: SourceEndpoint,
    pub source_key_param: String,
    pub pr_param: PrParam,
    pub github: Option<GitHubConfig>,
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("page_size", &self.page_size)
            .field("context_lines", &self.context_lines)
            .field("per_file_timeout", &self.per_file_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("fetch_concurrency", &self.fetch_concurrency)
            .field("retry_backoff", &self.retry_backoff)
            .field("source_endpoint", &self.source_endpoint)
            .field("source_key_param", &self.source_key_param)
            .field("pr_param", &self.pr_param)
            .field("github", &self.github)
            .finish()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            credential: None,
            base_url: DEFAULT_SONAR_API_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            context_lines: DEFAULT_CONTEXT_LINES,
            per_file_timeout: Duration::from_millis(5_000),
            request_timeout: Duration::from_millis(30_000),
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            retry_backoff: Duration::from_millis(250),
            source_endpoint: SourceEndpoint::Raw,
            source_key_param: "key".to_string(),
            pr_param: PrParam::PullRequest,
            github: None,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> SonarContextResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> SonarContextResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let base_url = match get("SONAR_API_BASE_URL") {
            Some(url) => {
                validate_http_endpoint("SONAR_API_BASE_URL", &url)?;
                trim_base(&url)
            }
            None => defaults.base_url,
        };

        let page_size = opt_number::<u32>(get("SONAR_PAGE_SIZE"), "SONAR_PAGE_SIZE")?
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE);

        let context_lines = opt_number::<u32>(get("SONAR_CONTEXT_LINES"), "SONAR_CONTEXT_LINES")?
            .unwrap_or(DEFAULT_CONTEXT_LINES);

        let per_file_timeout =
            opt_number::<u64>(get("SONAR_FILE_TIMEOUT_MS"), "SONAR_FILE_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.per_file_timeout);

        let request_timeout =
            opt_number::<u64>(get("SONAR_REQUEST_TIMEOUT_MS"), "SONAR_REQUEST_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout);

        let fetch_concurrency =
            opt_number::<usize>(get("SONAR_FETCH_CONCURRENCY"), "SONAR_FETCH_CONCURRENCY")?
                .unwrap_or(DEFAULT_FETCH_CONCURRENCY)
                .clamp(1, MAX_FETCH_CONCURRENCY);

        let retry_backoff =
            opt_number::<u64>(get("SONAR_RETRY_BACKOFF_MS"), "SONAR_RETRY_BACKOFF_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_backoff);

        let source_endpoint = match get("SONAR_SOURCE_ENDPOINT") {
            Some(v) => SourceEndpoint::parse("SONAR_SOURCE_ENDPOINT", &v)?,
            None => defaults.source_endpoint,
        };

        let source_key_param = get("SONAR_SOURCE_KEY_PARAM")
            .map(|v| v.trim().to_string())
            .unwrap_or(defaults.source_key_param);

        let pr_param = match get("SONAR_PR_PARAM") {
            Some(v) => PrParam::parse("SONAR_PR_PARAM", &v)?,
            None => defaults.pr_param,
        };

        let github = match get("GITHUB_TOKEN") {
            Some(token) => {
                let base_url = match get("GITHUB_API_BASE_URL") {
                    Some(url) => {
                        validate_http_endpoint("GITHUB_API_BASE_URL", &url)?;
                        trim_base(&url)
                    }
                    None => DEFAULT_GITHUB_API_BASE_URL.to_string(),
                };
                Some(GitHubConfig { base_url, token })
            }
            None => None,
        };

        Ok(Self {
            credential: get("SONAR_TOKEN"),
            base_url,
            page_size,
            context_lines,
            per_file_timeout,
            request_timeout,
            fetch_concurrency,
            retry_backoff,
            source_endpoint,
            source_key_param,
            pr_param,
            github,
        })
    }

    /// Returns the Sonar credential or the error reported on first use.
    pub fn require_credential(&self) -> Result<&str, ConfigError> {
        self.credential
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingVar("SONAR_TOKEN"))
    }
}

fn opt_number<T: std::str::FromStr>(
    value: Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match value {
        Some(v) => v.trim().parse::<T>().map(Some).map_err(|_| ConfigError::InvalidNumber {
            var,
            reason: "expected a non-negative integer",
        }),
        None => Ok(None),
    }
}

/// Validates that an HTTP endpoint starts with `http://` or `https://`.
fn validate_http_endpoint(var: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidFormat {
            var,
            reason: "must start with http:// or https://",
        })
    }
}

fn trim_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
