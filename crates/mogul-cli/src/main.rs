//! mogul-cli entry point.
//!
//! Headless harness for the accrual engine: runs the controller against
//! either the real backend (`--base-url` + session token) or the built-in
//! paper economy (`--paper`), and streams engine events to the log. Useful
//! for backend smoke tests and for watching reconcile behavior without a
//! game client.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use rust_decimal_macros::dec;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tracing::{info, warn};

use mogul_accrual::{AccrualController, EngineConfig, EngineEvent};
use mogul_economy::{EconomyClient, HttpEconomyClient};
use mogul_economy_paper::PaperEconomy;

#[derive(Parser, Debug)]
#[command(name = "mogul-cli", about = "Headless accrual engine harness")]
struct Args {
    /// Run against the built-in deterministic paper economy.
    #[arg(long)]
    paper: bool,

    /// Backend base URL, e.g. https://api.mogul.example
    #[arg(long, env = "MOGUL_BASE_URL")]
    base_url: Option<String>,

    /// Session token for the backend.
    #[arg(long, env = "MOGUL_SESSION_TOKEN", hide_env_values = true)]
    session_token: Option<String>,

    /// Local extrapolation step in milliseconds.
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,

    /// Authoritative sync cadence in milliseconds.
    #[arg(long, default_value_t = 2000)]
    sync_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist; deployments inject env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let args = Args::parse();
    let config = EngineConfig {
        tick_interval: Duration::from_millis(args.tick_ms),
        reconcile_interval: Duration::from_millis(args.sync_ms),
    };

    let client: Arc<dyn EconomyClient> = if args.paper {
        Arc::new(seeded_paper_economy())
    } else {
        let base_url = args
            .base_url
            .context("--base-url (or MOGUL_BASE_URL) is required without --paper")?;
        let token = args
            .session_token
            .context("--session-token (or MOGUL_SESSION_TOKEN) is required without --paper")?;
        Arc::new(HttpEconomyClient::new(base_url, token)?)
    };
    info!(service = client.service_name(), "starting accrual harness");

    let controller = AccrualController::new(client, config);
    let mut events = BroadcastStream::new(controller.subscribe());

    let present_capture = controller.activate().await?;
    if present_capture {
        if let Some(status) = controller.offline_status() {
            info!(
                pending = %status.pending_earnings,
                hours = status.elapsed_hours,
                capped = status.capped,
                "offline earnings pending; capturing"
            );
        }
        match controller.collect_offline_earnings().await {
            Ok(collected) => info!(%collected, "offline earnings captured"),
            Err(e) => warn!(error = %e, "offline capture failed"),
        }
    }

    let mut report = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
            _ = report.tick() => {
                let balance = controller.balance().await;
                info!(
                    displayed = %balance.displayed_cash,
                    synced = %balance.last_synced_cash,
                    paused = balance.sync_failed,
                    "balance"
                );
            }
            event = events.next() => match event {
                Some(Ok(EngineEvent::Synced { cash, income_per_hour })) => {
                    tracing::debug!(%cash, %income_per_hour, "synced");
                }
                Some(Ok(EngineEvent::SyncFailed { error })) => {
                    warn!(%error, "sync failed; display paused until next sync");
                }
                Some(Ok(_)) => {}
                // Balance events outpaced us; the next snapshot catches up.
                Some(Err(_lagged)) => {}
                None => break,
            }
        }
    }

    controller.shutdown();
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// Paper economy seeded with a visible income stream and a pending offline
/// pot, plus a driver task standing in for the server-side clock.
fn seeded_paper_economy() -> PaperEconomy {
    let econ = PaperEconomy::new();
    econ.set_cash(dec!(100));
    econ.set_income_per_hour(dec!(3600));
    econ.set_elapsed_seconds(1);
    econ.set_offline(dec!(50), 1.5, false, 8.0);

    let driver = econ.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(1));
        loop {
            tick.tick().await;
            // 3600/h accrues 1.00 per second server-side.
            driver.accrue(dec!(1));
        }
    });

    econ
}
