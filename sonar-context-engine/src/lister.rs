//! Lists the issues raised against one pull request.

use tracing::{debug, instrument, warn};

use crate::config::{MAX_PAGE_SIZE, MIN_PAGE_SIZE, PrParam};
use crate::errors::SonarContextResult;
use crate::model::{Issue, PrReference};
use crate::sonar::SonarClient;
use crate::sonar::types::IssueSearchResponse;

/// Returns the first page of issues in backend order.
///
/// An empty list is a valid answer; callers that need at least one issue
/// check for that themselves.
#[instrument(
    name = "list_issues",
    skip(client, pr),
    fields(project = %pr.project_key, pr = %pr.identifier)
)]
pub async fn list(
    client: &SonarClient,
    pr: &PrReference,
    pr_param: PrParam,
    page_size: u32,
) -> SonarContextResult<Vec<Issue>> {
    let page_size = page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE).to_string();

    let resp = client
        .call(
            "issues/search",
            &[
                ("componentKeys", pr.project_key.as_str()),
                (pr_param.as_str(), pr.identifier.as_str()),
                ("ps", page_size.as_str()),
                ("p", "1"),
            ],
        )
        .await?
        .into_json::<IssueSearchResponse>()?;

    if let Some(paging) = &resp.paging {
        if paging.total > u64::from(paging.page_size) {
            warn!(
                total = paging.total,
                page_size = paging.page_size,
                page = paging.page_index,
                "issue list spans several pages, only the first one is used"
            );
        }
    }

    let issues: Vec<Issue> = resp.issues.into_iter().map(Issue::new).collect();
    debug!(count = issues.len(), "issues listed");
    Ok(issues)
}
