use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use tunewatch_common::config::AppConfig;

const DEFAULT_FILTER: &str = "tunewatch=info,tunewatch_poller=info,tunewatch_engine=info,tunewatch_catalog=info,tunewatch_notifier=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();

    // Initialize tracing (the log file location is itself configuration)
    init_tracing(config.as_ref().ok().and_then(|c| c.log_file.as_deref()))?;

    let config = config.inspect_err(|e| {
        tracing::error!(error = %e, "Invalid configuration, refusing to start");
    })?;

    tracing::info!(
        playlist = %config.playlist_id,
        party_a = config.party_a.label(),
        party_b = config.party_b.label(),
        routing_rules = config.routing.len(),
        display_name_overrides = config.display_names.len(),
        state_file = %config.state_file.display(),
        "Tunewatch starting..."
    );

    let poller = tunewatch_poller::build(&config);

    // Run with graceful shutdown on Ctrl+C
    tokio::select! {
        _ = poller.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping...");
        }
    }

    tracing::info!("Tunewatch stopped.");
    Ok(())
}

/// JSON to stdout, plus a plain-text copy appended to `log_file` when set.
fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .with(file_layer)
        .init();
    Ok(())
}
