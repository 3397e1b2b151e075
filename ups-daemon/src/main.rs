//! UPS daemon entry point
//!
//! Load config → build inventory → probe → poll until Ctrl-C or SIGTERM.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ups_daemon::{DaemonConfig, LogReporter, PollLoop, ScriptExecutor, SnapshotBoard};
use ups_kernel::{Inventory, SnmpGet};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ups_daemon=info,ups_kernel=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "UPS daemon starting");

    let config = DaemonConfig::load().await.context("Failed to load configuration")?;
    if config.devices.is_empty() {
        warn!("No devices configured, nothing to monitor");
        return Ok(());
    }

    let inventory = Inventory::from_specs(&config.devices);
    if inventory.daemon_device().is_none() {
        warn!("No device has daemon = true, power actions are disabled");
    }

    let transport = SnmpGet::with_programs(
        config.snmp.snmpget.clone(),
        config.snmp.ping.clone(),
        config.snmp.timeout(),
    );
    let executor = ScriptExecutor::new(config.scripts.clone());
    let board = Arc::new(SnapshotBoard::new());

    let mut poll_loop = PollLoop::new(inventory, config.thresholds.clone(), transport, executor);
    poll_loop.add_reporter(Arc::new(LogReporter));
    poll_loop.add_reporter(board.clone());

    let cancel = CancellationToken::new();
    tokio::spawn(watch_signals(cancel.clone()));
    tokio::spawn(watch_board(board.subscribe(), cancel.clone()));

    poll_loop.startup().await;
    poll_loop.run(cancel).await;

    info!("UPS daemon stopped");
    Ok(())
}

async fn watch_signals(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Ctrl-C received, stopping"),
                    _ = sigterm.recv() => info!("SIGTERM received, stopping"),
                }
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
                info!("Ctrl-C received, stopping");
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Ctrl-C received, stopping");
    }
    cancel.cancel();
}

/// Read-only consumer of the snapshot board.
async fn watch_board(
    mut rx: tokio::sync::watch::Receiver<Arc<ups_daemon::Board>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let board = rx.borrow_and_update().clone();
                for (device, report) in board.iter() {
                    match report.to_json() {
                        Ok(json) => debug!(%device, report = %json, "Board updated"),
                        Err(e) => warn!(%device, error = %e, "Cannot serialize report"),
                    }
                }
            }
        }
    }
}
