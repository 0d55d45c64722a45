//! Sukashi - Video Watermarking Pipeline
//!
//! This is the main entry point for the sukashi command line tool, which
//! overlays still-image watermarks onto video files using ffmpeg.

use anyhow::Result;
use clap::Parser;
use std::io::Read;
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use sukashi::cli::{Args, Commands};
use sukashi::compose::WatermarkSpec;
use sukashi::config::Config;
use sukashi::geometry::{Position, SizeSpec};
use sukashi::request::RequestAdapter;
use sukashi::source::TrackKind;
use sukashi::workflow::Workflow;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            // Try to load config.toml from current directory first
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    // Execute command
    match args.command {
        Commands::Watermark {
            input,
            watermark,
            pos_x,
            pos_y,
            width,
            height,
            output_dir,
        } => {
            info!("Watermarking video file: {}", input.display());

            if output_dir.is_some() {
                config.export.output_dir = output_dir;
            }

            let spec = WatermarkSpec {
                image_path: watermark,
                position: Position { x: pos_x, y: pos_y },
                size: SizeSpec { width, height },
            };

            let workflow = Workflow::new(config)?;
            let output_path = workflow.add_watermark(&input, &spec, true).await?;
            println!("{}", output_path.display());
        }
        Commands::Batch {
            input_dir,
            watermark,
            pos_x,
            pos_y,
            width,
            height,
            output_dir,
        } => {
            info!("Watermarking directory: {}", input_dir.display());

            if output_dir.is_some() {
                config.export.output_dir = output_dir;
            }

            let spec = WatermarkSpec {
                image_path: watermark,
                position: Position { x: pos_x, y: pos_y },
                size: SizeSpec { width, height },
            };

            let workflow = Workflow::new(config)?;
            workflow.watermark_directory(&input_dir, &spec, true).await?;
        }
        Commands::Request { file, json } => {
            let raw = match (file, json) {
                (Some(path), _) => std::fs::read_to_string(path)?,
                (None, Some(inline)) => inline,
                (None, None) => {
                    let mut buffer = String::new();
                    std::io::stdin().read_to_string(&mut buffer)?;
                    buffer
                }
            };

            let workflow = Workflow::new(config)?;
            let adapter = RequestAdapter::new(workflow);
            let response = adapter.handle(&raw).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Probe { input } => {
            let workflow = Workflow::new(config)?;
            let asset = workflow.probe(&input).await?;

            println!("\n{}", asset.path.display());
            println!("Duration: {:.3}s", asset.duration.as_seconds());
            println!("{:<8} {:<8} {:<12} {:<12} {:<10}", "Index", "Kind", "Codec", "Size", "FPS");
            println!("{}", "-".repeat(54));
            for track in &asset.tracks {
                let kind = match track.kind {
                    TrackKind::Video => "video",
                    TrackKind::Audio => "audio",
                };
                let size = track
                    .natural_size
                    .map(|s| format!("{}x{}", s.width, s.height))
                    .unwrap_or_else(|| "-".to_string());
                let fps = track
                    .frame_rate
                    .map(|f| format!("{:.2}", f))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<8} {:<8} {:<12} {:<12} {:<10}",
                    track.index,
                    kind,
                    track.codec.as_deref().unwrap_or("-"),
                    size,
                    fps
                );
            }
        }
        Commands::Check => {
            let workflow = Workflow::new(config)?;
            let version = workflow.version_info().await?;
            println!("{}", version);
        }
    }

    info!("Sukashi completed successfully");
    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let sukashi_dir = std::env::current_dir()?.join(".sukashi");
    let log_dir = sukashi_dir.join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "sukashi.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Create console layer
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    // Create file layer
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    // Setup layered subscriber
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer);

    // Initialize the subscriber
    subscriber.try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
