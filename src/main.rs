//! Swipeshot - Three-finger swipe-to-screenshot daemon

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use swipeshot::config::{self, Config};
use swipeshot::gesture::{GESTURE_POINTERS, START_WINDOW_MS};
use swipeshot::input::{self, ReplaySource};
use swipeshot::service::{GestureService, ScreenshotAction};

/// Swipeshot - three-finger swipe-to-screenshot
#[derive(Parser)]
#[command(name = "swipeshot")]
#[command(author = "Swipeshot Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Take a screenshot by swiping down with three fingers", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the touchscreen and take screenshots on swipe
    Run {
        /// Touchscreen device (auto-detected if not set)
        #[arg(short, long)]
        device: Option<PathBuf>,

        /// Only log recognized swipes
        #[arg(long)]
        dry_run: bool,
    },

    /// Feed recorded frames (JSON lines) through the detector
    Replay {
        /// Recording to replay
        file: PathBuf,

        /// Run the screenshot command on recognition
        #[arg(long)]
        screenshot: bool,
    },

    /// List touchscreens
    Devices,

    /// Show current configuration
    Config {
        /// Generate sample configuration
        #[arg(long)]
        generate: bool,

        /// Output path for generated config
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show gesture thresholds and system information
    Info,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default().unwrap_or_default()
    };

    // Initialize logging
    let filter = if cli.verbose || config.general.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    config.validate()?;

    match cli.command {
        Commands::Run { device, dry_run } => {
            run_live(config, device, dry_run).await?;
        }
        Commands::Replay { file, screenshot } => {
            run_replay(config, file, screenshot).await?;
        }
        Commands::Devices => {
            list_devices()?;
        }
        Commands::Config { generate, output } => {
            if generate {
                let sample = config::generate_sample_config()?;
                if let Some(path) = output {
                    std::fs::write(&path, &sample)?;
                    println!("Configuration written to: {}", path.display());
                } else {
                    println!("{}", sample);
                }
            } else {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
        Commands::Info => {
            print_info(&config)?;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Watch a live touchscreen
#[cfg(target_os = "linux")]
async fn run_live(config: Config, device: Option<PathBuf>, dry_run: bool) -> anyhow::Result<()> {
    let screenshot = if dry_run {
        None
    } else {
        Some(ScreenshotAction::new(&config.screenshot)?)
    };

    let mut service = GestureService::new(&config, screenshot)?;
    let mut source = input::TouchscreenSource::new(device.or(config.input.device.clone()));

    println!("Watching touchscreen. Press Ctrl+C to stop.");
    let stats = service.run(&mut source, shutdown_signal()).await?;

    tracing::info!(
        "Processed {} frames, {} swipes, {} screenshots",
        stats.frames,
        stats.recognized,
        stats.screenshots
    );
    Ok(())
}

#[cfg(not(target_os = "linux"))]
async fn run_live(_config: Config, _device: Option<PathBuf>, _dry_run: bool) -> anyhow::Result<()> {
    input::ensure_live_capture()?;
    Ok(())
}

/// Replay a recording through the detector
async fn run_replay(config: Config, file: PathBuf, screenshot: bool) -> anyhow::Result<()> {
    let action = if screenshot {
        Some(ScreenshotAction::new(&config.screenshot)?)
    } else {
        None
    };

    let mut service = GestureService::new(&config, action)?;
    let mut source = ReplaySource::new(file);
    let stats = service.run(&mut source, shutdown_signal()).await?;

    println!("Frames:     {}", stats.frames);
    println!("Recognized: {}", stats.recognized);
    if screenshot {
        println!("Screenshots: {}", stats.screenshots);
    }
    Ok(())
}

#[cfg(target_os = "linux")]
fn list_devices() -> anyhow::Result<()> {
    for device in input::discover_touchscreens()? {
        println!("{}  {}", device.path.display(), device.name);
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn list_devices() -> anyhow::Result<()> {
    input::ensure_live_capture()?;
    Ok(())
}

/// Print thresholds and system information
fn print_info(config: &Config) -> anyhow::Result<()> {
    let metrics = config.display.metrics()?;
    let thresholds = swipeshot::gesture::Thresholds::from_metrics(&metrics);

    println!("Swipeshot System Information");
    println!("============================\n");

    println!("Platform: {}", input::platform_name());
    println!("Live capture: {}", input::live_capture_supported());
    println!(
        "Display: {}x{} @ {}x",
        metrics.width, metrics.height, metrics.density
    );

    println!("\nGesture:");
    println!("  Fingers: {}", GESTURE_POINTERS);
    println!("  Start window: {} ms", START_WINDOW_MS);
    println!("  Bottom edge reserve: {} px", thresholds.edge);
    println!("  Swipe distance (summed): {} px", thresholds.gesture);
    println!("  Max vertical spread: {} px", thresholds.max_vertical_spread);
    println!("  Max horizontal spread: {} px", thresholds.max_horizontal_spread);

    #[cfg(target_os = "linux")]
    {
        println!("\nLinux Requirements:");
        println!("  - User must be in 'input' group: sudo usermod -aG input $USER");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["swipeshot", "info"]);
        assert!(cli.is_ok());

        let cli = Cli::try_parse_from(["swipeshot", "replay", "swipe.jsonl", "--screenshot"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Replay { screenshot: true, .. })
        ));
    }
}
