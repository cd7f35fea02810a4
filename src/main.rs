//! Vault ledger daemon.
//!
//! Watches the wallet session, keeps the balance cache warm and logs when the
//! gated features lock or unlock.
//!
//! ```text
//!   wallet bridge ──▶ WalletWatcher ──▶ SessionMonitor ──┐ snapshot changes
//!                                                        ▼
//!   ticker ─────────────────────────────────────▶ balance refresh ──▶ BalanceCache ──▶ Vault
//!                                                                                 (mock | live)
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use vault_ledger::config;
use vault_ledger::lifecycle::{build_runtime, join_task, signals, Shutdown, VaultRuntime};
use vault_ledger::observability::{logging, metrics};
use vault_ledger::wallet::WalletWatcher;

#[derive(Parser)]
#[command(name = "vault-ledger")]
#[command(about = "Vault balance daemon", long_about = None)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = config::load(args.config.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "vault-ledger starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let runtime = Arc::new(build_runtime(config)?);
    let watcher = WalletWatcher::new(
        runtime.session.clone(),
        runtime.config.wallet.watch_interval(),
    )
    .spawn();

    let shutdown = Shutdown::new();
    let refresher = tokio::spawn(refresh_loop(runtime.clone(), shutdown.subscribe()));

    signals::shutdown_signal().await;
    tracing::info!("Shutting down");

    shutdown.trigger();
    watcher.stop().await;
    join_task("balance_refresh", refresher).await;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Refresh the active account's balance on every tick and whenever the wallet
/// session changes.
async fn refresh_loop(runtime: Arc<VaultRuntime>, mut shutdown: broadcast::Receiver<()>) {
    let period = runtime.config.cache.stale_after().max(Duration::from_secs(1));
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut changes = runtime.session.subscribe();
    let mut unlocked: Option<bool> = None;
    let mut account: Option<String> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            change = changes.recv() => {
                if let Err(broadcast::error::RecvError::Closed) = change {
                    break;
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("Balance refresh received shutdown signal, exiting loop");
                break;
            }
        }

        let active = runtime.session.active_address();
        if active != account {
            if let Some(previous) = account.as_deref() {
                runtime.cache.invalidate(Some(previous));
            }
            tracing::info!(address = active.as_deref().unwrap_or("-"), "Active account changed");
            account = active;
        }

        if !runtime.vault.is_mock() && account.is_none() {
            continue;
        }

        let balance = match runtime.cache.refresh(account.as_deref()).await {
            Ok(balance) => balance,
            Err(e) => {
                tracing::warn!(code = e.code(), error = %e, "Balance refresh failed");
                continue;
            }
        };

        let now_unlocked = runtime.vault.is_unlocked(balance);
        if unlocked != Some(now_unlocked) {
            tracing::info!(
                balance,
                min_balance = runtime.vault.minimum_required_balance(),
                status = if now_unlocked { "ACTIVE" } else { "LOCKED" },
                "Vault status"
            );
            unlocked = Some(now_unlocked);
        }
    }
}
