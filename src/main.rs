// Hostwarden - autonomous host watchdog
// Main entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use hostwarden::config::Config;
use hostwarden::host::RetryPolicy;
use hostwarden::notify::{self, Notifier, QuietHours};
use hostwarden::remediation::Remediator;
use hostwarden::report::render_status;
use hostwarden::scheduler::{Probes, Scheduler};
use hostwarden::version::build_info;
use std::path::PathBuf;
use tokio::sync::oneshot;

#[derive(Parser, Debug)]
#[command(name = "hostwarden")]
#[command(author, about, long_about = None)]
#[command(disable_version_flag = true)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Show version information
    #[arg(short = 'V', long)]
    version: bool,

    /// Show detailed build information
    #[arg(long)]
    build_info: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Start the watchdog daemon (default)
    Run,
    /// Collect one metrics snapshot and print it
    Status,
    /// Load the configuration and print the effective YAML
    CheckConfig,
    /// Send a test message through the configured channel
    TestNotify,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("{}", build_info().format_display());
        return Ok(());
    }

    if cli.build_info {
        println!("{}", build_info().format_detailed());
        println!("\n{}", build_info().format_build_info());
        return Ok(());
    }

    init_logging(cli.debug, cli.log_file.as_ref())?;
    let config = Config::load(cli.config.clone())?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::Status => status(config).await,
        Command::CheckConfig => {
            print!("{}", config.to_yaml()?);
            Ok(())
        }
        Command::TestNotify => test_notify(config).await,
    }
}

fn init_logging(debug: bool, log_file: Option<&PathBuf>) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
            let subscriber = tracing_subscriber::fmt()
                .with_max_level(level)
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            let subscriber = tracing_subscriber::fmt()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

async fn run(config: Config) -> Result<()> {
    tracing::info!("{} starting", build_info().format_detailed());

    let retry = RetryPolicy::default();
    let transport = notify::transport_from_config(&config.notifications)?;
    let (notifier, rx) = Notifier::new(QuietHours::from_config(&config.notifications.quiet_hours));
    let delivery = notify::spawn_delivery(rx, transport, RetryPolicy::delivery());

    let probes = Probes::system(&config);
    let remediator = Remediator::connect(probes.executor.clone(), &retry).await;
    let scheduler = Scheduler::new(config, probes, notifier.clone(), remediator);

    notifier.send(&format!("🟢 {} started", build_info().format_display()), false);

    let (stop_tx, stop_rx) = oneshot::channel();
    let signals = tokio::spawn(async move {
        wait_for_signal().await;
        let _ = stop_tx.send(());
    });

    scheduler.run(stop_rx).await;
    signals.abort();

    // Flush queued notifications; delivery ends once every sender is gone
    drop(notifier);
    if tokio::time::timeout(std::time::Duration::from_secs(10), delivery).await.is_err() {
        tracing::warn!("Pending notifications dropped on shutdown");
    }
    Ok(())
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

async fn status(config: Config) -> Result<()> {
    let probes = Probes::system(&config);
    let (notifier, _rx) = Notifier::new(QuietHours::disabled());
    let remediator = Remediator::new(None, probes.executor.clone());
    let scheduler = Scheduler::new(config, probes, notifier, remediator);

    // CPU usage needs two samples at least this far apart
    tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
    let stats = scheduler.collect_now().await;
    println!("{}", render_status(&stats));
    Ok(())
}

async fn test_notify(config: Config) -> Result<()> {
    let transport = notify::transport_from_config(&config.notifications)?;
    let host = sysinfo::System::host_name().unwrap_or_else(|| "host".to_string());
    transport
        .deliver(&format!("🔔 Test notification from hostwarden on {}", host))
        .await?;
    println!("Test notification sent via {}", transport.name());
    Ok(())
}
