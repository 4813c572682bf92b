pub mod index_route;
pub mod sonar_pr_issues;
