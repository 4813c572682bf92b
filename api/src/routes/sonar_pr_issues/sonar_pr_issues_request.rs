use serde::Deserialize;
use sonar_context_engine::{IssueQuery, RepoCoordinates};

use crate::error_handler::{AppError, AppResult};

pub const MISSING_PARAMETERS: &str = "Missing required parameters";

/// Query string of the PR issue endpoints.
///
/// `owner`, `repo` and `branch` select the GitHub source path and must be
/// given together.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SonarPrIssuesRequest {
    /// Sonar project key, e.g. `demo_org_app`.
    pub project_key: Option<String>,
    /// Pull request identifier as known to Sonar.
    pub pr_number: Option<String>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub branch: Option<String>,
}

/// Whether the endpoint insists on an explicit PR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrRequirement {
    Required,
    Discover,
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl SonarPrIssuesRequest {
    /// Validates the parameters; runs before any upstream call.
    pub fn into_query(self, pr: PrRequirement) -> AppResult<IssueQuery> {
        let project_key = non_blank(self.project_key);
        let pr_number = non_blank(self.pr_number);

        let Some(project_key) = project_key else {
            return Err(AppError::BadRequest(MISSING_PARAMETERS.into()));
        };
        if pr == PrRequirement::Required && pr_number.is_none() {
            return Err(AppError::BadRequest(MISSING_PARAMETERS.into()));
        }

        let repo = match (non_blank(self.owner), non_blank(self.repo), non_blank(self.branch)) {
            (Some(owner), Some(repo), Some(branch)) => Some(RepoCoordinates {
                owner,
                repo,
                branch,
            }),
            (None, None, None) => None,
            _ => {
                return Err(AppError::BadRequest(
                    "owner, repo and branch must be supplied together".into(),
                ));
            }
        };

        Ok(IssueQuery {
            project_key,
            pr_number,
            repo,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(project: Option<&str>, pr: Option<&str>) -> SonarPrIssuesRequest {
        SonarPrIssuesRequest {
            project_key: project.map(str::to_string),
            pr_number: pr.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn both_identifiers_are_required() {
        assert!(req(None, Some("1")).into_query(PrRequirement::Required).is_err());
        assert!(req(Some("p"), None).into_query(PrRequirement::Required).is_err());
        assert!(req(Some("p"), Some("  ")).into_query(PrRequirement::Required).is_err());
        let q = req(Some(" p "), Some("42")).into_query(PrRequirement::Required).unwrap();
        assert_eq!(q.project_key, "p");
        assert_eq!(q.pr_number.as_deref(), Some("42"));
        assert!(q.repo.is_none());
    }

    #[test]
    fn discovery_only_needs_the_project() {
        let q = req(Some("p"), None).into_query(PrRequirement::Discover).unwrap();
        assert!(q.pr_number.is_none());
    }

    #[test]
    fn repo_coordinates_come_as_a_set() {
        let partial = SonarPrIssuesRequest {
            owner: Some("acme".into()),
            ..req(Some("p"), Some("1"))
        };
        assert!(partial.into_query(PrRequirement::Required).is_err());

        let full = SonarPrIssuesRequest {
            owner: Some("acme".into()),
            repo: Some("app".into()),
            branch: Some("main".into()),
            ..req(Some("p"), Some("1"))
        };
        let q = full.into_query(PrRequirement::Required).unwrap();
        assert_eq!(q.repo.map(|r| r.branch), Some("main".to_string()));
    }
}
