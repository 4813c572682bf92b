use std::error::Error;

use sonar_context_engine::EngineConfig;
use tracing::{info, warn};

mod telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load environment variables from .env file when present.
    let dotenv = dotenvy::dotenv();

    telemetry::init()?;

    if let Err(err) = dotenv {
        warn!(%err, "no .env loaded, using process environment");
    }

    let config = EngineConfig::from_env()?;
    info!(?config, "configuration loaded");

    api::start(api::AppState::from_config(config)).await?;

    Ok(())
}
