use polybot_terminal::config::Config;
use polybot_terminal::feeds::http::HttpSource;
use polybot_terminal::feeds::simulated::SimulatedSource;
use polybot_terminal::feeds::DataSource;
use polybot_terminal::simulation::catalog::default_markets;
use polybot_terminal::sync::Synchronizer;
use polybot_terminal::telemetry::latency::LatencyTracker;
use polybot_terminal::telemetry::summary;

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

const CHAT_FALLBACK: &str = "Sorry, I couldn't reach the bot. Please try again.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load and validate config (reads .env automatically)
    let config = Config::load_or_default();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.telemetry.log_level)),
        )
        .with_target(false)
        .with_thread_ids(true)
        .init();

    info!("================================================");
    info!("  POLYBOT terminal v{}", env!("CARGO_PKG_VERSION"));
    info!("  Live mirror of the trading bot's state");
    info!("================================================");

    if let Err(e) = config.validate() {
        error!("Config validation failed: {e}");
        return Err(e);
    }

    // === Pick the data source ===
    let latency_tracker = Arc::new(LatencyTracker::new(500));
    let source: Arc<dyn DataSource> = if config.simulation.enabled {
        warn!(
            "SIMULATION MODE: synthetic backend, {} is ignored (failure rate {:.0}%)",
            config.api.base_url,
            config.simulation.failure_rate * 100.0
        );
        Arc::new(SimulatedSource::new(&config.simulation, default_markets()))
    } else {
        let http = HttpSource::new(&config.api, latency_tracker.clone())?;
        info!("Backend: {}", http.base_url());
        Arc::new(http)
    };

    // Shutdown signal
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let handle = Synchronizer::new(source, config.sync.clone()).start(&shutdown_tx);

    // === Spawn summary loop ===
    {
        let handle = handle.clone();
        let latency = latency_tracker.clone();
        let period = std::time::Duration::from_secs(config.telemetry.summary_interval_secs.max(1));
        let mut shutdown_rx = shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // Skip the immediate tick; nothing has synced yet.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        summary::log_summary(&handle.snapshot());
                        latency.log_summary();
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });
    }

    // === Spawn connectivity watcher ===
    {
        let mut state_rx = handle.subscribe();
        let mut shutdown_rx = shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut connected = false;
            loop {
                tokio::select! {
                    changed = state_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let now = state_rx.borrow_and_update().is_connected();
                        if now != connected {
                            connected = now;
                            if connected {
                                info!("Bot ONLINE");
                            } else {
                                warn!("Bot OFFLINE, showing last known state");
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });
    }

    // === Spawn chat prompt (one message per stdin line) ===
    {
        let handle = handle.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                tokio::select! {
                    line = lines.next_line() => {
                        let line = match line {
                            Ok(Some(l)) => l,
                            Ok(None) => break,
                            Err(e) => {
                                warn!("stdin closed: {e}");
                                break;
                            }
                        };
                        if line.trim().is_empty() {
                            continue;
                        }
                        match handle.send_chat(&line).await {
                            Some(reply) => println!("bot> {}", reply.content),
                            None => println!("bot> {CHAT_FALLBACK}"),
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });
    }

    info!("=== POLYBOT terminal running ===");
    info!("Type a message and press Enter to chat with the bot.");
    info!("Press Ctrl+C to shutdown.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Cleaning up...");
    let _ = shutdown_tx.send(());

    // Final summary
    summary::log_summary(&handle.snapshot());
    latency_tracker.log_summary();

    info!("POLYBOT terminal shutdown complete.");
    Ok(())
}
