//! GitHub contents API (REST v3) as an alternate source path.
//!
//! Endpoint used:
//!   * GET /repos/{owner}/{repo}/contents/{path}?ref={ref}

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::GitHubConfig;
use crate::errors::{SonarContextError, SonarContextResult};

/// Repository and ref to read files from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoCoordinates {
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

/// GitHub HTTP client wrapper.
#[derive(Clone)]
pub struct GitHubContentsClient {
    http: Client,
    base_api: String, // "https://api.github.com"
    token: String,
}

impl std::fmt::Debug for GitHubContentsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubContentsClient")
            .field("base_api", &self.base_api)
            .finish_non_exhaustive()
    }
}

impl GitHubContentsClient {
    pub fn from_config(cfg: &GitHubConfig) -> SonarContextResult<Self> {
        let http = crate::sonar::build_http_client()?;
        Ok(Self::new(http, cfg.base_url.clone(), cfg.token.clone()))
    }

    /// Constructs a GitHub client with a shared HTTP instance and auth token.
    pub fn new(http: Client, base_api: String, token: String) -> Self {
        debug!("Creating GitHubContentsClient with base_api={}", base_api);
        Self {
            http,
            base_api: base_api.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Fetches a file at `coords.branch` and decodes it to UTF-8 text.
    pub async fn fetch_file(
        &self,
        coords: &RepoCoordinates,
        repo_relative_path: &str,
    ) -> SonarContextResult<String> {
        let encoded_path = repo_relative_path
            .split('/')
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let url = format!(
            "{}/repos/{}/{}/contents/{}",
            self.base_api, coords.owner, coords.repo, encoded_path
        );
        debug!("GitHub fetch_file: url={}, ref={}", url, coords.branch);

        let resp = self
            .http
            .get(&url)
            .query(&[("ref", coords.branch.as_str())])
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SonarContextError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let payload: GitHubContent = resp.json().await?;
        decode_content(&payload)
    }
}

/// Contents API payload (subset).
#[derive(Debug, Deserialize)]
struct GitHubContent {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

fn decode_content(payload: &GitHubContent) -> SonarContextResult<String> {
    let content = payload.content.as_deref().ok_or_else(|| {
        SonarContextError::InvalidResponse("contents payload has no `content` (directory?)".into())
    })?;

    match payload.encoding.as_deref() {
        Some("base64") | None => {
            // GitHub wraps base64 at 60 columns.
            let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
            let bytes = STANDARD
                .decode(compact)
                .map_err(|e| SonarContextError::InvalidResponse(format!("bad base64: {e}")))?;
            String::from_utf8(bytes)
                .map_err(|e| SonarContextError::InvalidResponse(format!("file is not UTF-8: {e}")))
        }
        Some("utf-8") | Some("utf8") => Ok(content.to_string()),
        Some(other) => Err(SonarContextError::InvalidResponse(format!(
            "unsupported content encoding `{other}`"
        ))),
    }
}

/// Strips the project key from a component: `proj:src/a.py` → `src/a.py`.
pub fn component_path(component: &str) -> &str {
    component
        .split_once(':')
        .map_or(component, |(_, path)| path)
}
