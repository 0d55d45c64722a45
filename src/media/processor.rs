use async_trait::async_trait;
use std::path::Path;
use std::process::Command;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::MediaConfig;
use crate::error::{Result, SukashiError};
use super::{ExportProgress, MediaCommand, MediaCommandBuilder, MediaProcessorTrait, ProbeOutput};

/// Concrete implementation of media processor (FFmpeg-based)
pub struct MediaProcessorImpl {
    command_builder: MediaCommandBuilder,
}

impl MediaProcessorImpl {
    /// Create a new media processor implementation
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.ffmpeg_path, &config.ffprobe_path);

        Self { command_builder }
    }
}

#[async_trait]
impl MediaProcessorTrait for MediaProcessorImpl {
    /// Probe streams and container metadata of a media file
    async fn probe(&self, path: &Path) -> Result<ProbeOutput> {
        debug!("Probing media file: {}", path.display());

        let command = self.command_builder.probe(path);
        let stdout = command.capture_output().await.map_err(|e| match e {
            // ffprobe rejecting the file means it is not decodable media
            SukashiError::Media(detail) => SukashiError::Undecodable(detail),
            other => other,
        })?;

        ProbeOutput::parse(&stdout)
    }

    /// Execute an encode with progress updates published to `progress`
    async fn execute_monitored(
        &self,
        command: MediaCommand,
        progress: watch::Sender<ExportProgress>,
    ) -> Result<()> {
        info!("Executing monitored command: {}", command.description);
        command.execute_monitored(progress).await
    }

    /// Check if the media processor binaries are available
    fn check_availability(&self) -> Result<()> {
        for command in [
            self.command_builder.version_check(),
            self.command_builder.probe_version_check(),
        ] {
            let output = Command::new(&command.binary_path)
                .args(&command.args)
                .output()
                .map_err(|e| SukashiError::Media(format!("Media processor not found: {}", e)))?;

            if !output.status.success() {
                return Err(SukashiError::Media(format!(
                    "{} failed",
                    command.description
                )));
            }
        }

        info!("Media processor is available");
        Ok(())
    }

    /// Get media processor version information
    async fn version_info(&self) -> Result<String> {
        debug!("Getting media processor version information");

        let stdout = self.command_builder.version_check().capture_output().await?;

        // Extract the first line which typically contains the version
        let first_line = stdout.lines().next().unwrap_or("Unknown version");
        Ok(first_line.to_string())
    }
}
