use sonar_context_engine::{EngineConfig, SonarContextEngine};
use tracing::warn;

use crate::error_handler::{AppError, AppResult};

/// Shared state for all HTTP handlers.
pub struct AppState {
    /// Built once at startup; `None` when configuration is incomplete.
    engine: Option<SonarContextEngine>,
    /// Reported to callers while `engine` is unavailable.
    config_problem: String,
}

impl AppState {
    /// Builds the engine from configuration.
    ///
    /// A missing credential does not stop the server: handlers answer 500
    /// until the process is restarted with a token.
    pub fn from_config(config: EngineConfig) -> Self {
        match SonarContextEngine::from_config(config) {
            Ok(engine) => Self::with_engine(engine),
            Err(err) => {
                warn!(%err, "Sonar engine unavailable, requests will fail");
                Self {
                    engine: None,
                    config_problem: format!("API tokens are not configured in the environment: {err}"),
                }
            }
        }
    }

    pub fn with_engine(engine: SonarContextEngine) -> Self {
        Self {
            engine: Some(engine),
            config_problem: String::new(),
        }
    }

    pub fn engine(&self) -> AppResult<&SonarContextEngine> {
        self.engine
            .as_ref()
            .ok_or_else(|| AppError::Config(self.config_problem.clone()))
    }
}
