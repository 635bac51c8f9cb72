//! Cardioscope Application
//!
//! Command-line front end for the Cardioscope acquisition pipeline.
//!
//! # Usage
//!
//! ```bash
//! # Acquire with defaults (30 Hz, auto-detected port)
//! cardioscope
//!
//! # 100 Hz from a fixed port, start sampling as soon as it opens
//! cardioscope run --sample-rate 100 --port /dev/ttyUSB0 --autostart
//!
//! # Settings from a file, CLI flags still win
//! cardioscope --config cardioscope.toml run --dark
//!
//! # List serial ports
//! cardioscope devices
//!
//! # Print an exported session summary
//! cardioscope inspect session.csv
//! ```

mod console;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use cardioscope_native::bridge::{DeviceLinkManager, PortBackend, SystemPorts};
use cardioscope_native::config::AppConfig;
use cardioscope_native::export::read_record;
use cardioscope_native::scheduler::{AcquisitionScheduler, ControlCommand};
use cardioscope_native::viz::LogPresenter;

/// Cardioscope Application
#[derive(Parser, Debug)]
#[command(name = "cardioscope")]
#[command(author, version, about = "Serial ECG acquisition and heart-rate monitor", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Acquire and monitor (default if no subcommand)
    Run(RunArgs),

    /// List available serial ports
    Devices,

    /// Print a previously exported session summary
    Inspect {
        /// Exported CSV file
        path: PathBuf,
    },
}

#[derive(clap::Args, Debug, Default)]
struct RunArgs {
    /// Sampling rate in Hz (30-250)
    #[arg(short = 'r', long)]
    sample_rate: Option<u16>,

    /// Serial port path (e.g., /dev/ttyUSB0 or COM3); disables discovery
    #[arg(short, long)]
    port: Option<String>,

    /// Use the dark theme
    #[arg(long)]
    dark: bool,

    /// Default export destination
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Start sampling as soon as a device opens
    #[arg(long)]
    autostart: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Cardioscope v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        None => run(cli.config.as_deref(), RunArgs::default()),
        Some(Commands::Run(args)) => run(cli.config.as_deref(), args),
        Some(Commands::Devices) => list_devices(),
        Some(Commands::Inspect { path }) => inspect(&path),
    }
}

/// Merge the configuration file and CLI flags.
fn resolve_config(path: Option<&Path>, args: &RunArgs) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load_or_default(path)
        .with_context(|| format!("Failed to load configuration from {path:?}"))?;

    if let Some(rate) = args.sample_rate {
        config.sample_rate_hz = rate;
    }
    if let Some(port) = &args.port {
        config.port = Some(port.clone());
    }
    if args.dark {
        config.dark_theme = true;
    }
    if let Some(export) = &args.export {
        config.export_path = Some(export.clone());
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Run the acquisition loop until `quit` or Ctrl-C
fn run(config_path: Option<&Path>, args: RunArgs) -> anyhow::Result<()> {
    let config = resolve_config(config_path, &args)?;
    info!(
        rate_hz = config.sample_rate_hz,
        port = config.port.as_deref().unwrap_or("auto"),
        "Starting acquisition"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(async {
        let backend = SystemPorts::with_connect_timeout(config.connect_timeout());
        let link = DeviceLinkManager::new(Box::new(backend), config.link_config());
        let presenter = LogPresenter::new(config.theme());
        let mut scheduler = AcquisitionScheduler::from_config(&config, link, Box::new(presenter))?;

        if args.autostart && scheduler.reconnect_tick().is_connected() {
            scheduler.start();
        }

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(console::read_commands(tx.clone()));
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, shutting down");
                let _ = tx.send(ControlCommand::Shutdown).await;
            }
        });

        scheduler.run(rx).await;
        anyhow::Ok(())
    });

    // The console task may still be parked on a blocking stdin read
    runtime.shutdown_timeout(Duration::from_millis(250));
    result
}

/// List serial ports
fn list_devices() -> anyhow::Result<()> {
    info!("Scanning for serial ports...");

    #[cfg(not(feature = "serial"))]
    warn!("Serial support not enabled. Rebuild with --features serial");

    match SystemPorts::default().available_ports() {
        Ok(ports) if ports.is_empty() => info!("  (none found)"),
        Ok(ports) => {
            for port in ports {
                info!("  {}", port);
            }
        }
        Err(e) => warn!("  Error scanning ports: {}", e),
    }

    Ok(())
}

/// Print an exported session summary
fn inspect(path: &Path) -> anyhow::Result<()> {
    let summary =
        read_record(path).with_context(|| format!("Failed to read {}", path.display()))?;

    info!("Session {}", summary.timestamp);
    info!(
        "  Pulse (bpm): min {:.2}, avg {:.2}, max {:.2}",
        summary.min_bpm, summary.avg_bpm, summary.max_bpm
    );
    info!(
        "  Amplitude:   min {:.2}, avg {:.2}, max {:.2}",
        summary.min_amplitude, summary.avg_amplitude, summary.max_amplitude
    );

    Ok(())
}
