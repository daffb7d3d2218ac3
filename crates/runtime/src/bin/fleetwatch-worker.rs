//! fleetwatch-worker: runs the delay monitor and bus rotation against a
//! catalog snapshot file.
//!
//! Every fleet event (escalations, alerts, data errors, queue changes and
//! committed assignments) is logged as JSON until Ctrl-C.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use fleetwatch_core::config::{load_dotenv, Config};
use fleetwatch_core::{CatalogSnapshot, SnapshotCatalog};
use fleetwatch_notify::{FleetEvent, LogSink};
use fleetwatch_runtime::FleetRuntime;

// ── CLI ─────────────────────────────────────────────────────────────

/// Fleet worker: delay escalation monitor and assignment rotation.
#[derive(Parser, Debug)]
#[command(name = "fleetwatch-worker", version, about)]
struct Cli {
    /// Path to the JSON catalog snapshot (`trips` and `idleBuses`).
    #[arg(long, env = "FLEET_CATALOG", default_value = "data/catalog.json")]
    catalog: PathBuf,

    /// Re-read the catalog snapshot every N seconds (0 disables reloading).
    #[arg(long, env = "FLEET_CATALOG_RELOAD_SECS", default_value_t = 30)]
    reload_secs: u64,

    /// Config profile; overrides `FLEET_PROFILE`.
    #[arg(long)]
    profile: Option<String>,
}

fn load_snapshot(path: &Path) -> CatalogSnapshot {
    match CatalogSnapshot::from_file(path) {
        Ok(snapshot) => {
            info!(
                path = %path.display(),
                trips = snapshot.trips.len(),
                idle_buses = snapshot.idle_buses.len(),
                "loaded catalog snapshot"
            );
            snapshot
        }
        Err(e) => {
            warn!(error = %e, path = %path.display(), "failed to load catalog, starting empty");
            CatalogSnapshot::default()
        }
    }
}

fn log_event(event: &FleetEvent) {
    match serde_json::to_string(event) {
        Ok(json) => info!(kind = event.kind(), "{json}"),
        Err(e) => warn!(kind = event.kind(), error = %e, "failed to serialize event"),
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();

    let config = match cli.profile.as_deref() {
        Some(profile) => Config::for_profile(profile),
        None => Config::from_env(),
    };
    config.log_summary();

    let catalog = Arc::new(SnapshotCatalog::new(load_snapshot(&cli.catalog)));
    let sink = Arc::new(LogSink);
    let handle = FleetRuntime::start(config, catalog.clone(), sink.clone(), sink);

    let mut events = handle.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event log lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let reload_period = Duration::from_secs(cli.reload_secs.max(1));
    let mut reload = tokio::time::interval(reload_period);
    // The first tick completes immediately; the snapshot was just loaded.
    reload.tick().await;

    loop {
        tokio::select! {
            _ = reload.tick(), if cli.reload_secs > 0 => {
                match catalog.reload_from(&cli.catalog) {
                    Ok(()) => {
                        handle.sync_idle_buses().await;
                    }
                    Err(e) => warn!(error = %e, path = %cli.catalog.display(), "catalog reload failed, keeping previous snapshot"),
                }
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "failed to listen for ctrl-c");
                }
                info!("shutdown requested");
                break;
            }
        }
    }

    handle.stop().await;
    Ok(())
}
