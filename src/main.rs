//! dmk-capture binary: list cameras or snap a single frame to disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dmk_capture::validation::is_supported_camera;
use dmk_capture::{CameraSession, Config, Driver, Sink, TisDriver};

#[derive(Parser, Debug)]
#[command(name = "dmk-capture", version, about = "Snap frames from a DMK 33GP031/23GP031 camera")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = "dmk-capture.toml")]
    config: PathBuf,

    /// Log driver calls and live transitions
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List devices the driver can see
    List,
    /// Snap one frame to a .tif file
    Snap {
        /// Output file
        #[arg(default_value = "test.tif")]
        output: PathBuf,
        /// Video format, e.g. "Y16 (1024x768)"
        #[arg(long)]
        format: Option<String>,
        /// Exposure in seconds
        #[arg(long)]
        exposure: Option<f64>,
        /// Snap timeout in milliseconds (default: wait forever)
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

fn main() {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn setup_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(&cli.config)?;

    match cli.command {
        Commands::List => {
            let driver = TisDriver::init(&config.driver)?;
            list(&driver);
            Ok(())
        }
        Commands::Snap {
            output,
            format,
            exposure,
            timeout_ms,
        } => {
            if let Some(format) = format {
                config.session.video_format = format;
            }
            if let Some(exposure) = exposure {
                config.session.exposure_seconds = exposure;
            }
            if timeout_ms.is_some() {
                config.session.snap_timeout_ms = timeout_ms;
            }
            config.validate()?;
            snap(&config, &output)
        }
    }
}

fn list(driver: &TisDriver) {
    let names = driver.device_names();
    if names.is_empty() {
        println!("No devices found");
    }
    for (index, name) in names.iter().enumerate() {
        let marker = if is_supported_camera(name) { "*" } else { " " };
        println!("{marker} [{index}] {name}");
    }
}

fn snap(config: &Config, output: &Path) -> Result<()> {
    let driver = TisDriver::init(&config.driver)?;
    let mut camera =
        CameraSession::open(&driver, &config.session).context("failed to open camera")?;

    let timeout = config.session.snap_timeout();
    camera
        .snap(&mut [Sink::File(output)], timeout)
        .with_context(|| format!("failed to snap into {}", output.display()))?;
    println!(
        "Saved {} ({})",
        output.display(),
        describe_timeout(timeout)
    );

    camera.close()?;
    Ok(())
}

fn describe_timeout(timeout: Option<Duration>) -> String {
    timeout.map_or_else(
        || "no timeout".to_owned(),
        |t| format!("timeout {} ms", t.as_millis()),
    )
}
