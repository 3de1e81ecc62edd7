//! resi-tracker server binary.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use resi_tracker::config::load_or_default;
use resi_tracker::http::HttpServer;
use resi_tracker::lifecycle::{self, signals, Shutdown};
use resi_tracker::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "resi-tracker")]
#[command(about = "Courier shipment tracking service", long_about = None)]
struct Args {
    /// Path to the TOML config file. Defaults apply when omitted.
    #[arg(short, long, env = "RESI_TRACKER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_or_default(args.config.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "resi-tracker starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        step_timeout_secs = config.timeouts.step_secs,
        cache_enabled = config.cache.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let pages = lifecycle::build_page_provider(&config).await;
    let service = Arc::new(lifecycle::build_service(&config, pages).await?);
    let listener = lifecycle::startup::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_watcher(shutdown);

    HttpServer::new(service).run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
