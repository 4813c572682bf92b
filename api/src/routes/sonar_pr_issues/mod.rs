pub mod sonar_pr_issues_request;
pub mod sonar_pr_issues_route;
