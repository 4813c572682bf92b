//! Wire types for the structured Sonar endpoints (subsets).

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::{Map, Value};

/// `issues/search` response.
#[derive(Debug, Deserialize)]
pub struct IssueSearchResponse {
    #[serde(default)]
    pub issues: Vec<Map<String, Value>>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Paging {
    pub page_index: u32,
    pub page_size: u32,
    pub total: u64,
}

/// `project_pull_requests/list` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestListResponse {
    #[serde(default)]
    pub pull_requests: Vec<SonarPullRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SonarPullRequest {
    pub key: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub analysis_date: Option<String>,
}

impl SonarPullRequest {
    /// Sonar renders dates as `2017-04-01T02:15:42+0200`; accept RFC3339 too.
    pub fn analyzed_at(&self) -> Option<DateTime<FixedOffset>> {
        let raw = self.analysis_date.as_deref()?.trim();
        DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z")
            .or_else(|_| DateTime::parse_from_rfc3339(raw))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pr(date: Option<&str>) -> SonarPullRequest {
        SonarPullRequest {
            key: "1".into(),
            branch: None,
            title: None,
            analysis_date: date.map(str::to_string),
        }
    }

    #[test]
    fn parses_both_date_renderings() {
        let a = pr(Some("2024-04-01T02:15:42+0200")).analyzed_at().unwrap();
        let b = pr(Some("2024-04-01T00:15:42Z")).analyzed_at().unwrap();
        assert_eq!(a, b);
        assert!(pr(Some("yesterday")).analyzed_at().is_none());
        assert!(pr(None).analyzed_at().is_none());
    }
}
