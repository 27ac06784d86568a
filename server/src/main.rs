//! SaccharumVision Server
//!
//! HTTP API for sugarcane leaf disease classification. Loads the model once
//! at startup and serves predictions, class metadata and stored uploads.

mod error;
mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use saccharum_vision::utils::logging::{init_logging, LogConfig};
use saccharum_vision::{AppConfig, Environment, Predictor};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::state::AppState;

/// SaccharumVision Server
#[derive(Parser, Debug)]
#[command(name = "saccharum-server")]
#[command(version)]
#[command(about = "HTTP API for sugarcane leaf disease classification")]
struct Cli {
    /// Port to listen on
    #[arg(short, long, env = "SACCHARUM_PORT")]
    port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "SACCHARUM_HOST")]
    host: Option<String>,

    /// JSON configuration file
    #[arg(short, long, env = "SACCHARUM_CONFIG")]
    config: Option<PathBuf>,

    /// Weights record
    #[arg(long, env = "SACCHARUM_MODEL")]
    model: Option<PathBuf>,

    /// Class list JSON
    #[arg(long, env = "SACCHARUM_CLASSES")]
    classes: Option<PathBuf>,

    /// Directory for stored uploads
    #[arg(long, env = "SACCHARUM_UPLOAD_DIR")]
    upload_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SACCHARUM_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();
    let env = Environment::from_env();

    // Build configuration
    let mut config = AppConfig::resolve(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(model) = cli.model {
        config.model_path = model;
    }
    if let Some(classes) = cli.classes {
        config.classes_path = classes;
    }
    if let Some(upload_dir) = cli.upload_dir {
        config.upload_dir = upload_dir;
    }

    // Initialize logging
    let mut log_config = LogConfig::for_deployment(cli.verbose || config.debug);
    if let Some(level) = cli.log_level.as_deref() {
        log_config = log_config.with_level_name(level);
    }
    init_logging(&log_config).map_err(anyhow::Error::msg)?;

    info!("SaccharumVision Server v{} ({})", saccharum_vision::VERSION, env);
    info!("Configuration:");
    if let Some(path) = &cli.config {
        info!("  File:        {:?}", path);
    }
    info!("  Model:       {:?}", config.model_path);
    info!("  Classes:     {:?}", config.classes_path);
    info!("  Uploads:     {:?}", config.upload_dir);
    info!("  Max upload:  {} bytes", config.max_content_length);

    // Startup validation is fatal
    let path_errors = config.validate_paths();
    if !path_errors.is_empty() {
        error!("Errors found:");
        for e in &path_errors {
            error!("  - {}", e);
        }
        anyhow::bail!("Startup validation failed with {} error(s)", path_errors.len());
    }
    info!("All paths validated");

    let predictor = Predictor::from_config(&config).map_err(|e| {
        error!("Could not initialize the model: {}", e);
        e
    })?;
    info!("Model loaded: {}", predictor.model_info().name);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    // Create shared state
    let state = Arc::new(AppState::new(config, Some(Arc::new(predictor))));

    // Build router
    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    info!("Endpoints:");
    info!("  POST /api/predict          TTA prediction");
    info!("  POST /api/predict-improved TTA prediction (alias)");
    info!("  POST /api/predict-top3     Top 3 predictions");
    info!("  GET  /api/health           Server status");
    info!("  GET  /api/classes          Available classes");
    info!("  GET  /api/model            Model information");
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
