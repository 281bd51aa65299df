//! Mutiny coordination server binary.
//!
//! Usage: `mutiny-server [config.yaml]`. Without an argument the server
//! reads `mutiny-config.yaml` from the working directory when present and
//! falls back to defaults otherwise.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration
//! 3. Build the starting world from the configured scenario
//! 4. Bind the listener and serve until the run ends or Ctrl-C

use std::path::PathBuf;

use mutiny_core::{ConfigError, SimulationConfig};
use mutiny_server::{Server, ServerError};
use mutiny_world::ScenarioError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "mutiny-config.yaml";

/// Top-level error for the server binary.
#[derive(Debug, thiserror::Error)]
enum AppError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    /// The scenario could not be loaded or built.
    #[error("scenario error: {source}")]
    Scenario {
        #[from]
        source: ScenarioError,
    },

    /// Serving the run failed.
    #[error("server error: {source}")]
    Server {
        #[from]
        source: ServerError,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("mutiny-server starting");

    let config = load_config()?;
    info!(
        host = config.server.host,
        port = config.server.port,
        time_limit_secs = config.run.time_limit_secs,
        results_dir = %config.run.results_dir.display(),
        "Configuration loaded"
    );

    let world = config
        .load_scenario()
        .and_then(|scenario| scenario.build())
        .map_err(AppError::from)?;
    let score = world.score();
    info!(
        dim = world.dim(),
        actors = world.actors().count(),
        enemies = score.enemies,
        civilians = score.civilians,
        "Starting world built"
    );

    let server = Server::bind(config, world).await.map_err(AppError::from)?;
    let record = server
        .run(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "Ctrl-C handler failed, serving until the run ends");
                std::future::pending::<()>().await;
            }
            info!("Ctrl-C received, shutting down");
        })
        .await
        .map_err(AppError::from)?;

    info!(
        run_id = %record.run_id,
        end_reason = %record.end_reason,
        "mutiny-server stopped"
    );
    Ok(())
}

fn load_config() -> Result<SimulationConfig, AppError> {
    let path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if path.exists() {
        Ok(SimulationConfig::from_file(&path)?)
    } else {
        info!(path = %path.display(), "Config file not found, using defaults");
        Ok(SimulationConfig::parse("")?)
    }
}
