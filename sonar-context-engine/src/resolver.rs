//! Decides which pull request a request operates on.
//!
//! Deployments expose PR discovery inconsistently, so resolution falls back
//! step by step: explicit value, newest open PR, newest PR-tagged issue.

use tracing::{debug, info, instrument, warn};

use crate::config::PrParam;
use crate::errors::{NotFoundKind, SonarContextError, SonarContextResult};
use crate::model::{Issue, PrReference, ResolutionMethod};
use crate::sonar::SonarClient;
use crate::sonar::types::{IssueSearchResponse, PullRequestListResponse};

/// How many recent issues are scanned for a PR association.
pub const RECENT_ISSUE_WINDOW: u32 = 50;

/// Resolves the PR to query for `project_key`.
///
/// An explicit, non-blank `explicit_pr` short-circuits without any network
/// call. Discovered identifiers match `pr_param`: the PR key for
/// `pullRequest`, the source branch name for `branch`.
#[instrument(name = "resolve_pr", skip(client))]
pub async fn resolve(
    client: &SonarClient,
    project_key: &str,
    explicit_pr: Option<&str>,
    pr_param: PrParam,
) -> SonarContextResult<PrReference> {
    if let Some(pr) = explicit_pr.map(str::trim).filter(|p| !p.is_empty()) {
        return Ok(PrReference {
            project_key: project_key.to_string(),
            identifier: pr.to_string(),
            resolution_method: ResolutionMethod::Explicit,
        });
    }

    if let Some(identifier) = latest_open_pr(client, project_key, pr_param).await? {
        info!(%identifier, "resolved PR from open pull request listing");
        return Ok(PrReference {
            project_key: project_key.to_string(),
            identifier,
            resolution_method: ResolutionMethod::LatestOpen,
        });
    }

    if let Some(identifier) = pr_from_recent_issues(client, project_key, pr_param).await? {
        info!(%identifier, "resolved PR from recent issues");
        return Ok(PrReference {
            project_key: project_key.to_string(),
            identifier,
            resolution_method: ResolutionMethod::InferredFromIssue,
        });
    }

    warn!("no pull request could be resolved");
    Err(SonarContextError::NotFound(NotFoundKind::PullRequest))
}

/// Most recently analyzed open PR, or `None` when the listing is empty or
/// the endpoint is not available on this deployment.
async fn latest_open_pr(
    client: &SonarClient,
    project_key: &str,
    pr_param: PrParam,
) -> SonarContextResult<Option<String>> {
    let resp = match client
        .call("project_pull_requests/list", &[("project", project_key)])
        .await
    {
        Ok(resp) => resp,
        Err(SonarContextError::Upstream { status, .. }) if is_unsupported(status) => {
            debug!(status, "pull request listing unsupported, falling back");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    let mut prs = resp.into_json::<PullRequestListResponse>()?.pull_requests;
    // Stable sort: undated entries go last, ties keep listing order.
    prs.sort_by(|a, b| b.analyzed_at().cmp(&a.analyzed_at()));

    let newest = prs.into_iter().find_map(|pr| {
        let id = match pr_param {
            PrParam::PullRequest => Some(pr.key.clone()),
            PrParam::Branch => pr.branch.clone().filter(|b| !b.trim().is_empty()),
        }?;
        debug!(key = %pr.key, branch = ?pr.branch, title = ?pr.title, "newest open pull request");
        Some(id)
    });
    Ok(newest)
}

/// First PR association among the most recently created issues.
async fn pr_from_recent_issues(
    client: &SonarClient,
    project_key: &str,
    pr_param: PrParam,
) -> SonarContextResult<Option<String>> {
    let page_size = RECENT_ISSUE_WINDOW.to_string();
    let resp = client
        .call(
            "issues/search",
            &[
                ("componentKeys", project_key),
                ("s", "CREATION_DATE"),
                ("asc", "false"),
                ("ps", page_size.as_str()),
            ],
        )
        .await?;

    let found = resp
        .into_json::<IssueSearchResponse>()?
        .issues
        .into_iter()
        .map(Issue::new)
        .find_map(|issue| match pr_param {
            PrParam::PullRequest => issue.pull_request(),
            PrParam::Branch => issue.branch().map(str::to_string),
        });

    Ok(found)
}

/// Older servers answer unknown web services with 400 or 404.
fn is_unsupported(status: u16) -> bool {
    matches!(status, 400 | 404 | 405)
}
