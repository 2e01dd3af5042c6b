//! osc2midi - OSC to MIDI control change bridge

use anyhow::Result;
use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use osc2midi::{device, Arguments, DEFAULT_OSC_PORT};

/// Bridge OSC messages to MIDI control change events
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    config: Option<PathBuf>,

    /// The UDP port to listen on for OSC messages
    #[arg(short, long, default_value_t = DEFAULT_OSC_PORT)]
    port: u16,

    /// Debug mode: list MIDI devices and log every OSC message
    #[arg(long)]
    debug: bool,

    /// The MIDI device to use (case-insensitive substring matching)
    #[arg(long)]
    midi_device: Option<String>,

    /// Network interface to listen on
    #[arg(long, default_value = osc2midi::net::DEFAULT_INTERFACE)]
    interface: String,

    /// Listen on this address instead of the interface address
    #[arg(long)]
    bind: Option<IpAddr>,

    /// Reject duplicate addresses and out-of-range MIDI targets
    #[arg(long)]
    strict: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI output ports
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => match parse_failure_exit_code(&e) {
            Some(code) => {
                let _ = e.print();
                std::process::exit(code);
            }
            None => e.exit(),
        },
    };

    if let Err(e) = run(args).await {
        eprintln!("Error starting: {:#}", e);
        std::process::exit(EXIT_FAILURE);
    }
}

/// Exit status for any startup failure, bad arguments included
const EXIT_FAILURE: i32 = 1;

/// Exit code for a rejected command line, `None` for `--help` and `--version`
fn parse_failure_exit_code(e: &clap::Error) -> Option<i32> {
    e.use_stderr().then_some(EXIT_FAILURE)
}

async fn run(args: Args) -> Result<()> {
    init_logging(&args.log_level, args.debug)?;

    if args.list_devices {
        device::print_ports()?;
        return Ok(());
    }

    let Some(config_path) = args.config else {
        anyhow::bail!("a configuration file is required (see --help)");
    };

    let bridge_args = Arguments {
        config_path,
        port: args.port,
        debug: args.debug,
        midi_device: args.midi_device,
        interface: args.interface,
        bind: args.bind,
        strict: args.strict,
    };

    osc2midi::start(bridge_args, shutdown_signal()).await?;

    info!("osc2midi shutdown complete");
    Ok(())
}

/// `--debug` wins over `RUST_LOG`, which wins over `--log-level`
fn log_filter(level: &str, debug: bool) -> EnvFilter {
    if debug {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn init_logging(level: &str, debug: bool) -> Result<()> {
    tracing_subscriber::registry()
        .with(log_filter(level, debug))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .try_init()?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
