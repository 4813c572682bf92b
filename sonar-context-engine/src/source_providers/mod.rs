//! Source facade without async-trait or dynamic trait objects.
//!
//! `SourceProvider` wraps the concrete places a file's full text can come
//! from and returns it in the canonical line form. It is built per request
//! because it carries the PR (or branch) the files are read at.

pub mod github;

use tracing::debug;

use crate::config::{EngineConfig, PrParam, SourceEndpoint};
use crate::errors::SonarContextResult;
use crate::model::{PrReference, SourceLine};
use crate::sonar::SonarClient;
use crate::sonar::normalize::text_to_lines;
use github::{GitHubContentsClient, RepoCoordinates, component_path};

/// Sonar source retrieval bound to one PR.
#[derive(Debug, Clone)]
pub struct SonarSource {
    client: SonarClient,
    endpoint: SourceEndpoint,
    key_param: String,
    pr_param: PrParam,
    pr: String,
}

/// Concrete source path with enum dispatch.
#[derive(Debug, Clone)]
pub enum SourceProvider {
    Sonar(SonarSource),
    GitHub {
        client: GitHubContentsClient,
        coords: RepoCoordinates,
    },
}

impl SourceProvider {
    /// Reads sources from the analysis backend at the PR's revision.
    pub fn sonar(client: SonarClient, cfg: &EngineConfig, pr: &PrReference) -> Self {
        Self::Sonar(SonarSource {
            client,
            endpoint: cfg.source_endpoint,
            key_param: cfg.source_key_param.clone(),
            pr_param: cfg.pr_param,
            pr: pr.identifier.clone(),
        })
    }

    /// Reads sources from the source-hosting API at `coords.branch`.
    pub fn github(client: GitHubContentsClient, coords: RepoCoordinates) -> Self {
        Self::GitHub { client, coords }
    }

    /// Fetches the full text of `component` as numbered lines.
    pub async fn fetch_file(&self, component: &str) -> SonarContextResult<Vec<SourceLine>> {
        match self {
            Self::Sonar(src) => {
                debug!(component, endpoint = src.endpoint.path(), "fetching source from Sonar");
                let params = [
                    (src.key_param.as_str(), component),
                    (src.pr_param.as_str(), src.pr.as_str()),
                ];
                match src.endpoint {
                    // File content verbatim; a JSON file is still just text.
                    SourceEndpoint::Raw => {
                        let text = src.client.call_text(src.endpoint.path(), &params).await?;
                        Ok(text_to_lines(&text))
                    }
                    SourceEndpoint::Lines | SourceEndpoint::Show => {
                        src.client.call(src.endpoint.path(), &params).await?.into_lines()
                    }
                }
            }
            Self::GitHub { client, coords } => {
                let path = component_path(component);
                debug!(component, path, "fetching source from GitHub");
                let text = client.fetch_file(coords, path).await?;
                Ok(text_to_lines(&text))
            }
        }
    }
}
