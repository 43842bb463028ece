//! Main entry point for the crypto-crawler CLI

use clap::Parser;
use crypto_crawler::cli::Cli;
use crypto_crawler::metrics::init_metrics;
use crypto_crawler::shutdown::ShutdownCoordinator;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
///
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(level: &str) {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("crypto_crawler={level}")));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.resolve_config()?;
    init_tracing(config.tracing_level());

    if let Some(addr) = cli.metrics_addr {
        init_metrics(addr)?;
    }

    // Install shutdown coordinator and Ctrl+C handler
    let shutdown = ShutdownCoordinator::shared();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Ctrl+C received - shutting down...");
                shutdown.request_shutdown();
            }
        }
    });

    cli.execute(&config, shutdown).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("Command failed: {:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
