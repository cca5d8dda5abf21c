//! LED Matrix Control Tool
//!
//! CLI for drawing to and clearing USB LED matrices.

mod config;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ledmatrix_hw::{
    Frame, Geometry, HidBackend, MatrixSession, MemoryBackend, SessionRegistry, UsbBackend,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use config::Config;

#[derive(Parser)]
#[command(name = "ledmatrixctl")]
#[command(about = "Control tool for USB LED matrices")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Device path (overrides configuration)
    #[arg(short, long)]
    device: Option<String>,

    /// Matrix geometry as ROWSxCOLS or ROWSxCOLSxBPP (overrides configuration)
    #[arg(short, long)]
    geometry: Option<String>,

    /// Record packets in memory instead of writing to hardware
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Draw a raw frame file (device-native bytes)
    Draw {
        /// Path to the frame file
        file: PathBuf,
    },
    /// Fill the whole matrix with one byte value
    Fill {
        /// Byte value, decimal or 0x-prefixed hex
        #[arg(value_parser = parse_byte)]
        value: u8,
    },
    /// Turn every LED off
    Clear,
    /// Write a configuration file from the current settings
    InitConfig {
        /// Output file path
        #[arg(default_value = "ledmatrix.toml")]
        output: PathBuf,
    },
    /// Show device information
    Info {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Settings after merging the configuration file with command-line flags.
struct Settings {
    device: String,
    geometry: Geometry,
    dry_run: bool,
}

fn parse_byte(s: &str) -> std::result::Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|_| format!("'{}' is not a byte value (0-255 or 0x00-0xFF)", s))
}

fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let config = merged_config(cli)?;
    let geometry = config.geometry()?;

    let Some(device) = config.device else {
        bail!("No device path given. Use --device or set `device` in the configuration");
    };

    Ok(Settings {
        device,
        geometry,
        dry_run: config.dry_run,
    })
}

/// Builds a configuration from the loaded file (if any) and command-line flags.
fn merged_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(device) = &cli.device {
        config.device = Some(device.clone());
    }
    if let Some(geometry) = &cli.geometry {
        let geometry: Geometry = geometry.parse().context("Invalid --geometry")?;
        config.geometry = geometry.to_string();
    }
    config.dry_run |= cli.dry_run;
    Ok(config)
}

fn handle_init_config(cli: &Cli, output: &Path) -> Result<()> {
    if output.exists() {
        bail!("{} already exists", output.display());
    }
    merged_config(cli)?.save(output)?;
    println!("Configuration written to: {}", output.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Commands::InitConfig { output } = &cli.command {
        return handle_init_config(&cli, output);
    }

    let settings = resolve_settings(&cli)?;

    let memory = MemoryBackend::new().with_device(&settings.device);
    let backend: &dyn UsbBackend = if settings.dry_run {
        info!("Dry run: packets are recorded, not sent");
        &memory
    } else {
        &HidBackend
    };

    let result = match cli.command {
        Commands::Info { json } => handle_info(&settings, backend, json),
        Commands::Draw { file } => with_session(&settings, backend, |s| draw_file(s, &file)),
        Commands::Fill { value } => with_session(&settings, backend, |s| fill(s, value)),
        Commands::Clear => with_session(&settings, backend, clear),
        Commands::InitConfig { .. } => Ok(()),
    };

    if settings.dry_run {
        debug!(
            "Dry run recorded {} packets for {}",
            memory.write_count(&settings.device),
            settings.device
        );
    }
    result
}

/// Opens the configured device, runs `f`, and closes the session on every path.
fn with_session<F>(settings: &Settings, backend: &dyn UsbBackend, f: F) -> Result<()>
where
    F: FnOnce(&MatrixSession) -> Result<()>,
{
    let registry = Arc::new(SessionRegistry::new());
    let session = MatrixSession::open(backend, &registry, &settings.device, settings.geometry)
        .with_context(|| format!("Failed to open {}", settings.device))?;
    let result = f(&session);
    session.close();
    result
}

fn draw_file(session: &MatrixSession, file: &Path) -> Result<()> {
    let data = std::fs::read(file)
        .with_context(|| format!("Failed to read frame file {}", file.display()))?;
    let frame = Frame::from_bytes(session.geometry(), data)?;
    session.stage_frame(frame)?;
    session.commit().context("Failed to draw frame")?;
    println!("Frame drawn from: {}", file.display());
    Ok(())
}

fn fill(session: &MatrixSession, value: u8) -> Result<()> {
    let mut frame = Frame::new(session.geometry());
    frame.fill(value);
    session.stage_frame(frame)?;
    session.commit().context("Failed to draw frame")?;
    println!("Matrix filled with: 0x{:02X}", value);
    Ok(())
}

fn clear(session: &MatrixSession) -> Result<()> {
    session.clear().context("Failed to clear matrix")?;
    println!("Matrix cleared");
    Ok(())
}

fn handle_info(settings: &Settings, backend: &dyn UsbBackend, json: bool) -> Result<()> {
    // Probe by opening and immediately releasing the device
    let connected = backend.open(&settings.device).is_ok();

    if json {
        let info = serde_json::json!({
            "device": settings.device,
            "geometry": settings.geometry.to_string(),
            "rows": settings.geometry.rows(),
            "columns": settings.geometry.columns(),
            "bytes_per_pixel": settings.geometry.bytes_per_pixel(),
            "frame_size": settings.geometry.frame_size(),
            "dry_run": settings.dry_run,
            "connected": connected,
        });
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("Matrix Status:");
        println!("  Device: {}", settings.device);
        println!("  Geometry: {}", settings.geometry);
        println!("  Frame size: {} bytes", settings.geometry.frame_size());
        println!("  Connected: {}", if connected { "yes" } else { "no" });
        if settings.dry_run {
            println!("  Mode: dry run");
        }
    }

    Ok(())
}
