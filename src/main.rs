use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use txnwatch::config::Config;
use txnwatch::monitor::engine::RateClassifier;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    // Initialize structured logging (set RUST_LOG=debug for rejected payloads)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Usage: txnwatch [serve|analyze] [config.toml]
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let command = match args.first().map(String::as_str) {
        Some("serve") | Some("analyze") => args.remove(0),
        _ => "serve".to_string(),
    };

    let config = match args.first() {
        Some(path) => {
            let config = Config::load(path)?;
            tracing::info!("Configuration loaded from {}", path);
            config
        }
        None => Config::load_or_default(DEFAULT_CONFIG_PATH)?,
    };

    match command.as_str() {
        "analyze" => {
            tracing::info!("Running checkout analysis");
            txnwatch::analysis::run(&config.analysis, &config.monitor.thresholds)
        }
        _ => serve(config).await,
    }
}

async fn serve(config: Config) -> eyre::Result<()> {
    let classifier = Arc::new(RateClassifier::from_config(&config.monitor));
    tracing::info!(
        failed_rate_threshold = config.monitor.thresholds.failed_rate_threshold,
        denied_rate_threshold = config.monitor.thresholds.denied_rate_threshold,
        reversed_rate_threshold = config.monitor.thresholds.reversed_rate_threshold,
        notifier = ?config.monitor.notifier.kind,
        "Transaction monitor starting"
    );

    let shutdown = CancellationToken::new();
    let mut server = {
        let shutdown = shutdown.clone();
        let host = config.api.host.clone();
        let port = config.api.port;
        tokio::spawn(async move { txnwatch::api::serve(classifier, &host, port, shutdown).await })
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Shutdown signal received, stopping API server...");
        }
        result = &mut server => {
            // Only reached when the server exits on its own, e.g. bind failure
            return result?;
        }
    }

    shutdown.cancel();
    server.await??;

    tracing::info!("Transaction monitor stopped gracefully");
    Ok(())
}
