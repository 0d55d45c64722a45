use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Overlay a watermark image onto a single video file
    Watermark {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Watermark image file (PNG, JPEG or WebP)
        #[arg(short, long)]
        watermark: PathBuf,

        /// Horizontal position as a fraction of the frame width
        #[arg(short = 'x', long, default_value = "0.8")]
        pos_x: f64,

        /// Vertical position as a fraction of the frame height
        #[arg(short = 'y', long, default_value = "0.8")]
        pos_y: f64,

        /// Watermark width in pixels
        #[arg(long, default_value = "100")]
        width: f64,

        /// Watermark height in pixels
        #[arg(long, default_value = "100")]
        height: f64,

        /// Output directory for the encoded file
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Apply the same watermark to every video file in a directory
    Batch {
        /// Input directory containing video files
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Watermark image file (PNG, JPEG or WebP)
        #[arg(short, long)]
        watermark: PathBuf,

        /// Horizontal position as a fraction of the frame width
        #[arg(short = 'x', long, default_value = "0.8")]
        pos_x: f64,

        /// Vertical position as a fraction of the frame height
        #[arg(short = 'y', long, default_value = "0.8")]
        pos_y: f64,

        /// Watermark width in pixels
        #[arg(long, default_value = "100")]
        width: f64,

        /// Watermark height in pixels
        #[arg(long, default_value = "100")]
        height: f64,

        /// Output directory for the encoded files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Handle a JSON watermark request and print the JSON response
    Request {
        /// File containing the request JSON
        #[arg(short, long, conflicts_with = "json")]
        file: Option<PathBuf>,

        /// Inline request JSON
        #[arg(short, long)]
        json: Option<String>,
    },

    /// Show stream and duration information for a media file
    Probe {
        /// Input media file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Verify the media processing binaries are available
    Check,
}
