//! CKD Risk Predictor - Main Entry Point
//!
//! Loads the predictor once, then serves the intake form and prediction
//! endpoints over HTTP.

use anyhow::{Context, Result};
use ckd_predictor::{
    config::{AppConfig, LoggingConfig},
    metrics::{MetricsReporter, SubmissionMetrics},
    web::{self, AppState},
    PredictorCache, SubmissionHandler,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("ckd_predictor={}", logging.level).parse()?)
        .add_directive(format!("tower_http={}", logging.level).parse()?);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/config.toml".to_string());

    // Load configuration
    let config = AppConfig::load_from_path(&config_path)?;
    init_tracing(&config.logging)?;

    info!("Starting CKD Risk Predictor");
    info!(path = %config_path, "Configuration loaded");

    // Load the predictor once; failure here is fatal
    let cache = PredictorCache::from_config(&config.model);
    let predictor = cache.load_predictor().with_context(|| {
        format!(
            "Failed to load {:?} model from {}",
            config.model.format, config.model.path
        )
    })?;
    info!(model = %predictor.name(), "Predictor ready");

    let metrics = Arc::new(SubmissionMetrics::new());
    let handler = SubmissionHandler::new(predictor, metrics.clone());

    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let app = web::router(AppState::new(handler, metrics.clone()));

    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Predictor shutting down...");
    metrics.print_summary();

    Ok(())
}
