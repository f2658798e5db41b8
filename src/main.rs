use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use hd_smart_idle::cli::{Cli, Command, RunArgs, StandbyArgs};
use hd_smart_idle::config::DaemonConfig;
use hd_smart_idle::daemon::Daemon;
use hd_smart_idle::hw::{resolve_devices, DeviceControl, DryRun, HdparmControl};
use hd_smart_idle::standby::run_standby;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // RUST_LOG wins over --log-level
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!("hd_smart_idle={}", cli.log_level))
            .with_context(|| format!("invalid log level {:?}", cli.log_level))?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("hd-smart-idle v{}", env!("CARGO_PKG_VERSION"));

    let control = HdparmControl::from_env();
    info!("  hdparm: {}", control.program().display());

    match cli.command {
        Command::Run(args) => run(args, control).await,
        Command::Standby(args) => standby(args, control).await,
    }
}

async fn run(args: RunArgs, control: HdparmControl) -> Result<()> {
    let devices = resolve_devices(&control, args.devices.clone())
        .await
        .context("failed to auto-detect mechanical disks")?;

    if devices.is_empty() {
        warn!("no mechanical disks found, idling until shutdown");
    } else if args.devices.is_empty() {
        info!("auto-detected mechanical disks: {:?}", devices);
    }

    let config = args.to_config(devices);
    config.validate()?;
    info!("configuration: {}", config);

    if config.mode.is_dry_run() {
        info!("dry-run mode: standby timeouts will be logged, not applied");
        run_daemon(config, DryRun::new(control)).await
    } else {
        run_daemon(config, control).await
    }
}

async fn run_daemon<C>(config: DaemonConfig, control: C) -> Result<()>
where
    C: DeviceControl + 'static,
{
    let daemon = Daemon::new(config, control);
    let cancel = CancellationToken::new();

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(()) => info!("received shutdown signal"),
            Err(e) => error!("failed to listen for shutdown signals, stopping: {}", e),
        }
        signal_cancel.cancel();
    });

    daemon.run(cancel).await?;
    Ok(())
}

async fn standby(args: StandbyArgs, control: HdparmControl) -> Result<()> {
    if args.dry_run {
        run_standby(&DryRun::new(control), &args.devices, args.value).await
    } else {
        run_standby(&control, &args.devices, args.value).await
    }
}

/// Wait for SIGINT or SIGTERM (Unix) or Ctrl+C elsewhere
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
