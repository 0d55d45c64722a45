use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, SukashiError};

fn default_frame_rate() -> u32 {
    30
}

fn default_watermark_opacity() -> f32 {
    0.8
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub media: MediaConfig,
    pub render: RenderConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Path to ffprobe binary
    pub ffprobe_path: String,
    /// Additional encoding options appended to every export
    /// Common options: ["-tune", "film", "-profile:v", "high"]
    pub encode_options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Output frame rate. The pipeline renders at a fixed rate rather than
    /// carrying the source timing through; 30 fps unless overridden here.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    /// Watermark layer opacity in [0, 1]. Defaults to 0.8.
    #[serde(default = "default_watermark_opacity")]
    pub watermark_opacity: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory for output files. Every export gets a freshly generated
    /// UUID-based file name under this directory, so concurrent jobs never
    /// collide. Empty means the system temporary directory.
    pub output_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            media: MediaConfig {
                ffmpeg_path: "ffmpeg".to_string(),
                ffprobe_path: "ffprobe".to_string(),
                encode_options: vec![],
            },
            render: RenderConfig {
                frame_rate: default_frame_rate(),
                watermark_opacity: default_watermark_opacity(),
            },
            export: ExportConfig { output_dir: None },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SukashiError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| SukashiError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SukashiError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SukashiError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Resolve the export output directory, falling back to the system temp dir
    pub fn output_dir(&self) -> PathBuf {
        match &self.export.output_dir {
            Some(dir) => dir.clone(),
            None => std::env::temp_dir(),
        }
    }
}
