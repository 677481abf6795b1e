use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

use trashwatch::config::Config;
use trashwatch::integration::TrackerPipeline;
use trashwatch::monitor::Monitor;
use trashwatch::server::{self, AppState};
use trashwatch::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    telemetry::init(&config.log_file)
        .with_context(|| format!("failed to open log file {}", config.log_file.display()))?;

    let detector = config.detector().inspect_err(|e| {
        error!(error = %e, "Failed to load model from {}", config.model_path.display());
    })?;
    let source = config.frame_source().inspect_err(|e| {
        error!(error = %e, "Failed to initialize camera");
    })?;

    let cors = server::cors_layer(&config.cors_origin)
        .with_context(|| format!("invalid CORS origin {}", config.cors_origin))?;
    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;

    let pipeline = TrackerPipeline::new(detector, config.tracker_config(), config.count_policy);
    let monitor = Monitor::new(
        source,
        pipeline,
        config.alert_dispatcher(),
        config.monitor_config(),
    );
    let total = monitor.total();
    let stop = monitor.stop_signal();

    let worker = std::thread::Builder::new()
        .name("detection-loop".into())
        .spawn(move || monitor.run())
        .context("failed to spawn detection loop")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            // Dropping the sender would stop the server.
            std::future::pending::<()>().await;
        }
        info!("Shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    let app = server::router(
        AppState::new(total, config.push_interval(), shutdown_rx.clone()),
        cors,
    );
    let served = server::serve(listener, app, shutdown_rx).await;

    stop.stop();
    let frames = tokio::task::spawn_blocking(move || worker.join())
        .await
        .context("failed to join detection loop")?
        .map_err(|_| anyhow::anyhow!("detection loop panicked"))?;
    info!(frames, "Shut down cleanly");

    served.context("server error")
}
