// Modular media processing architecture
//
// This module provides a clean abstraction over the ffmpeg/ffprobe backend:
// - Processor: concrete implementation with abstract command building
// - Commands: command builders and monitored execution
// - Probe: ffprobe JSON output model

pub mod commands;
pub mod probe;
pub mod processor;

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::watch;

pub use commands::*;
pub use probe::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::Result;

/// Main trait for media processing operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProcessorTrait: Send + Sync {
    /// Probe streams and container metadata of a media file
    async fn probe(&self, path: &Path) -> Result<ProbeOutput>;

    /// Execute an encode with progress updates published to `progress`
    async fn execute_monitored(
        &self,
        command: MediaCommand,
        progress: watch::Sender<ExportProgress>,
    ) -> Result<()>;

    /// Check if the media processor binaries are available
    fn check_availability(&self) -> Result<()>;

    /// Get media processor version information
    async fn version_info(&self) -> Result<String>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (FFmpeg-based)
    pub fn create_processor(config: MediaConfig) -> std::sync::Arc<dyn MediaProcessorTrait> {
        std::sync::Arc::new(processor::MediaProcessorImpl::new(config))
    }
}
