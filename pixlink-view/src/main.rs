//! PixLink viewer — entry point.
//!
//! ```text
//! pixlink-view                    Connect using pixlink-view.toml
//! pixlink-view --device <path>    Use a serial device (Linux)
//! pixlink-view --tcp <addr>       Use a TCP-simulated device
//! pixlink-view --config <path>    Load a custom config TOML
//! pixlink-view --gen-config       Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pixlink_view::app::ViewerApp;
use pixlink_view::config::{LoadOutcome, ViewConfig};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "pixlink-view", about = "PixLink pixel display viewer")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "pixlink-view.toml")]
    config: PathBuf,

    /// Serial device path (overrides the config).
    #[arg(long)]
    device: Option<String>,

    /// TCP address of a simulated device (overrides the config).
    #[arg(long)]
    tcp: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&ViewConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // Load config, then apply CLI overrides.
    let (mut config, load_outcome) = ViewConfig::load(&cli.config);
    if let Some(device) = cli.device {
        config.link.transport = "tty".into();
        config.link.device = device;
    }
    if let Some(addr) = cli.tcp {
        config.link.transport = "tcp".into();
        config.link.address = addr;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    // Report how the config resolved, now that logging is up.
    match &load_outcome {
        LoadOutcome::Loaded => info!("config loaded from {}", cli.config.display()),
        LoadOutcome::Missing => info!("no config at {}; using defaults", cli.config.display()),
        LoadOutcome::Invalid(e) => {
            warn!("invalid config {}: {e}; using defaults", cli.config.display());
        }
    }

    info!("pixlink-view v{}", env!("CARGO_PKG_VERSION"));
    info!("transport: {}", config.link.transport);
    info!(
        "display: {}x{} @ {} bits/color",
        config.display.width, config.display.height, config.display.bits_per_color
    );
    info!("baud: {}", config.link.baud_rate);

    ViewerApp::new(config).run().await
}
