//! Sonar Web API client (SonarCloud / SonarQube).
//!
//! Endpoints used:
//!   * GET /issues/search?componentKeys=..&pullRequest=..&ps=..&p=1
//!   * GET /project_pull_requests/list?project=..
//!   * GET /sources/raw?key=..          (or sources/lines, sources/show)

pub mod normalize;
pub mod types;

pub use normalize::NormalizedResponse;

use reqwest::{Client, header};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::errors::{ConfigError, SonarContextError, SonarContextResult};

/// Longest upstream body kept for error details.
const MAX_ERROR_BODY: usize = 4 * 1024;

/// Authenticated, stateless transport to the analysis backend.
#[derive(Clone)]
pub struct SonarClient {
    http: Client,
    base_api: String, // e.g. "https://sonarcloud.io/api"
    token: String,
}

impl std::fmt::Debug for SonarClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SonarClient")
            .field("base_api", &self.base_api)
            .finish_non_exhaustive()
    }
}

impl SonarClient {
    /// Constructs a client from configuration.
    ///
    /// Fails with a config error when no credential is configured.
    pub fn from_config(cfg: &EngineConfig) -> SonarContextResult<Self> {
        let token = cfg.require_credential()?.to_string();
        let http = build_http_client()?;
        Ok(Self::new(http, cfg.base_url.clone(), token))
    }

    /// Constructs a client with a shared HTTP instance and bearer token.
    pub fn new(http: Client, base_api: String, token: String) -> Self {
        debug!("Creating SonarClient with base_api={}", base_api);
        Self {
            http,
            base_api: base_api.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Authenticated GET against `{base_api}/{endpoint}`.
    ///
    /// Non-2xx responses become [`SonarContextError::Upstream`] with the body
    /// passed through; network failures become `Transport` or `Timeout`.
    pub async fn call(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> SonarContextResult<NormalizedResponse> {
        let (content_type, body) = self.get(endpoint, params).await?;
        Ok(NormalizedResponse::from_body(content_type.as_deref(), body))
    }

    /// Same as [`call`](Self::call) but keeps the body as text.
    ///
    /// For endpoints that return file content verbatim, where a file that
    /// happens to be JSON must not be interpreted.
    pub async fn call_text(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> SonarContextResult<String> {
        let (_, body) = self.get(endpoint, params).await?;
        Ok(body)
    }

    async fn get(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> SonarContextResult<(Option<String>, String)> {
        let url = format!("{}/{}", self.base_api, endpoint.trim_start_matches('/'));
        debug!("Sonar call: url={}, params={}", url, params.len());

        let resp = self
            .http
            .get(&url)
            .query(params)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), endpoint, "Sonar call failed");
            return Err(SonarContextError::Upstream {
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }

        Ok((content_type, body))
    }
}

/// Shared HTTP client with a stable user agent.
pub(crate) fn build_http_client() -> SonarContextResult<Client> {
    Client::builder()
        .user_agent(concat!("sonar-context-engine/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| SonarContextError::from(ConfigError::HttpClient(e.to_string())))
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}
