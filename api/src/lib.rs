use std::{env, sync::Arc};

mod core;
pub mod error_handler;
mod middleware_layer;
mod routes;

use axum::{Router, middleware, routing::get};
use tokio::signal;
use tracing::{error, info};

pub use crate::core::app_state::AppState;
pub use crate::error_handler::{AppError, AppResult};

use crate::routes::{
    index_route::index,
    sonar_pr_issues::sonar_pr_issues_route::{sonar_latest_pr_issues_route, sonar_pr_issues_route},
};

/// Builds the HTTP surface around an already configured state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/get-sonar-pr-issues", get(sonar_pr_issues_route))
        .route("/get-sonar-latest-pr-issues", get(sonar_latest_pr_issues_route))
        .layer(middleware::from_fn(middleware_layer::request_id::request_id))
        .with_state(state)
}

/// `API_ADDRESS`, else `0.0.0.0:$PORT` with `PORT` defaulting to 8080.
fn listen_address() -> String {
    env::var("API_ADDRESS")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| {
            let port = env::var("PORT").unwrap_or_else(|_| "8080".into());
            format!("0.0.0.0:{port}")
        })
}

pub async fn start(state: AppState) -> AppResult<()> {
    let host_url = listen_address();
    let app = router(Arc::new(state));

    // Bind to address
    let listener = tokio::net::TcpListener::bind(&host_url)
        .await
        .map_err(AppError::Bind)?;
    info!(address = %host_url, "listening");

    // Start server with graceful shutdown on Ctrl+C
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)
}

/// Returns a future that resolves when Ctrl+C is pressed
async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => {
            error!(%err, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
