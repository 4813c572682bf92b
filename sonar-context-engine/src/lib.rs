//! Issue-to-source enrichment for static-analysis pull request issues.
//!
//! The pipeline resolves the pull request, lists its issues, locates each
//! issue's line, fetches every referenced file once, and returns the issues
//! in listing order with the surrounding source attached. Source failures
//! stay local to the issues they affect.

pub mod aggregator;
pub mod assembler;
pub mod config;
pub mod errors;
pub mod fetcher;
pub mod lister;
pub mod locator;
pub mod model;
pub mod resolver;
pub mod sonar;
pub mod source_providers;

use tracing::{debug, info, instrument};

pub use crate::config::EngineConfig;
pub use crate::errors::{ConfigError, NotFoundKind, SonarContextError, SonarContextResult};
pub use crate::model::{
    EnrichedIssue, Issue, PrReference, ResolutionMethod, ResolutionStatus, ResultEnvelope,
};
pub use crate::source_providers::github::RepoCoordinates;

use crate::fetcher::{FetchPolicy, SourceFetcher};
use crate::locator::Located;
use crate::sonar::SonarClient;
use crate::source_providers::SourceProvider;
use crate::source_providers::github::GitHubContentsClient;

/// What a caller asks for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueQuery {
    pub project_key: String,
    /// `None` runs PR discovery.
    pub pr_number: Option<String>,
    /// Read sources from the source-hosting API instead of Sonar.
    pub repo: Option<RepoCoordinates>,
}

/// Clients and configuration, built once per process and shared by requests.
///
/// Holds no per-request state; the file cache lives inside each call.
#[derive(Debug, Clone)]
pub struct SonarContextEngine {
    config: EngineConfig,
    sonar: SonarClient,
    github: Option<GitHubContentsClient>,
}

impl SonarContextEngine {
    /// Builds the clients described by `config`.
    ///
    /// Fails with [`ConfigError::MissingVar`] when no Sonar token is set.
    pub fn from_config(config: EngineConfig) -> SonarContextResult<Self> {
        let sonar = SonarClient::from_config(&config)?;
        let github = config
            .github
            .as_ref()
            .map(GitHubContentsClient::from_config)
            .transpose()?;
        Ok(Self::new(config, sonar, github))
    }

    pub fn new(
        config: EngineConfig,
        sonar: SonarClient,
        github: Option<GitHubContentsClient>,
    ) -> Self {
        Self {
            config,
            sonar,
            github,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs the whole pipeline within the configured request timeout.
    pub async fn fetch_pr_issue_context(
        &self,
        query: &IssueQuery,
    ) -> SonarContextResult<ResultEnvelope> {
        let budget = self.config.request_timeout;
        match tokio::time::timeout(budget, self.run(query)).await {
            Ok(result) => result,
            Err(_) => Err(SonarContextError::RequestTimeout(budget)),
        }
    }

    #[instrument(
        name = "pr_issue_context",
        skip(self, query),
        fields(project = %query.project_key, pr = ?query.pr_number)
    )]
    async fn run(&self, query: &IssueQuery) -> SonarContextResult<ResultEnvelope> {
        let project_key = query.project_key.trim();
        if project_key.is_empty() {
            return Err(SonarContextError::Validation("projectKey must not be blank".into()));
        }
        let github = match &query.repo {
            Some(coords) => Some((self.github_client()?, coords)),
            None => None,
        };

        let pr = resolver::resolve(
            &self.sonar,
            project_key,
            query.pr_number.as_deref(),
            self.config.pr_param,
        )
        .await?;
        let issues = lister::list(&self.sonar, &pr, self.config.pr_param, self.config.page_size)
            .await?;

        let provider = match github {
            Some((client, coords)) => SourceProvider::github(client.clone(), coords.clone()),
            None => SourceProvider::sonar(self.sonar.clone(), &self.config, &pr),
        };

        let located: Vec<Located> = issues
            .iter()
            .map(|issue| {
                let loc = locator::locate(issue, self.config.context_lines);
                if loc == Located::NoLineInfo {
                    debug!(issue = ?issue.key(), "issue has no line information");
                }
                loc
            })
            .collect();

        let mut fetcher = SourceFetcher::new(&provider, FetchPolicy::from(&self.config));
        fetcher
            .prefetch(located.iter().filter_map(|l| match l {
                Located::Window(bounds) => Some(bounds.component.as_str()),
                Located::NoLineInfo => None,
            }))
            .await;
        debug!(files = fetcher.cache().len(), "source cache filled");

        let enriched: Vec<EnrichedIssue> = issues
            .into_iter()
            .zip(&located)
            .map(|(issue, loc)| {
                let fetched = match loc {
                    Located::Window(bounds) => Some(fetcher.cached_window(bounds)),
                    Located::NoLineInfo => None,
                };
                assembler::assemble(issue, loc, fetched)
            })
            .collect();

        info!(
            pr = %pr.identifier,
            method = ?pr.resolution_method,
            issues = enriched.len(),
            "pull request issues enriched"
        );
        Ok(aggregator::aggregate(&pr, enriched))
    }

    fn github_client(&self) -> SonarContextResult<&GitHubContentsClient> {
        self.github
            .as_ref()
            .ok_or(SonarContextError::Config(ConfigError::MissingVar("GITHUB_TOKEN")))
    }
}
