use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use sonar_context_engine::{NotFoundKind, ResultEnvelope};
use tracing::{info, instrument};

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
    routes::sonar_pr_issues::sonar_pr_issues_request::{PrRequirement, SonarPrIssuesRequest},
};

/// GET /get-sonar-pr-issues?projectKey=..&prNumber=..[&owner=..&repo=..&branch=..]
///
/// Lists the issues of one pull request, each with its surrounding source.
#[instrument(name = "sonar_pr_issues_route", skip_all)]
pub async fn sonar_pr_issues_route(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SonarPrIssuesRequest>, QueryRejection>,
) -> AppResult<Json<ResultEnvelope>> {
    let Query(params) = params?;
    respond(&state, params, PrRequirement::Required).await
}

/// GET /get-sonar-latest-pr-issues?projectKey=..[&prNumber=..][&owner=..&repo=..&branch=..]
///
/// Same as above, but discovers the pull request when none is given.
#[instrument(name = "sonar_latest_pr_issues_route", skip_all)]
pub async fn sonar_latest_pr_issues_route(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SonarPrIssuesRequest>, QueryRejection>,
) -> AppResult<Json<ResultEnvelope>> {
    let Query(params) = params?;
    respond(&state, params, PrRequirement::Discover).await
}

async fn respond(
    state: &AppState,
    params: SonarPrIssuesRequest,
    pr: PrRequirement,
) -> AppResult<Json<ResultEnvelope>> {
    let query = params.into_query(pr)?;
    let engine = state.engine()?;

    info!(
        project = %query.project_key,
        pr = ?query.pr_number,
        github = query.repo.is_some(),
        "fetching pull request issues"
    );

    let envelope = engine.fetch_pr_issue_context(&query).await?;
    if envelope.issues.is_empty() {
        return Err(AppError::NotFound(NotFoundKind::Issues.to_string()));
    }
    Ok(Json(envelope))
}
