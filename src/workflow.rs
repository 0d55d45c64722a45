use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::compose::{Compositor, WatermarkSpec};
use crate::config::Config;
use crate::error::{Result, SukashiError};
use crate::export::{unique_output_path, Exporter, ExportStatus};
use crate::media::{MediaProcessorFactory, MediaProcessorTrait};
use crate::source::{MediaAsset, MediaSource};

pub struct Workflow {
    config: Config,
    media: Arc<dyn MediaProcessorTrait>,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        let media = MediaProcessorFactory::create_processor(config.media.clone());

        // Check dependencies
        media.check_availability()?;

        Ok(Self { config, media })
    }

    /// Construct with a specific processor implementation
    pub fn with_processor(config: Config, media: Arc<dyn MediaProcessorTrait>) -> Self {
        Self { config, media }
    }

    /// Apply a watermark to a single video file. Returns the path of the
    /// newly encoded MP4.
    ///
    /// Validation, probe and composition failures return synchronously;
    /// encode failures and cancellation arrive through the export job's
    /// terminal status and are mapped to errors here.
    pub async fn add_watermark(
        &self,
        video_path: &Path,
        spec: &WatermarkSpec,
        show_progress: bool,
    ) -> Result<PathBuf> {
        info!("Adding watermark to {}", video_path.display());

        if !video_path.is_file() {
            return Err(SukashiError::FileNotFound(video_path.display().to_string()));
        }
        if !spec.image_path.is_file() {
            return Err(SukashiError::FileNotFound(spec.image_path.display().to_string()));
        }

        let asset = MediaSource::open(self.media.as_ref(), video_path).await?;

        let compositor = Compositor::new(self.config.render.clone());
        let composition = compositor.build(&asset, spec)?;

        let output_dir = self.config.output_dir();
        tokio::fs::create_dir_all(&output_dir).await?;
        let output_path = unique_output_path(&output_dir);

        let exporter = Exporter::new(Arc::clone(&self.media), self.config.media.clone());
        let handle = exporter.export(&composition, output_path)?;

        let bar_task = if show_progress {
            Some(spawn_progress_bar(handle.progress()))
        } else {
            None
        };

        let status = handle.wait().await;

        if let Some(task) = bar_task {
            let _ = task.await;
        }

        match status {
            ExportStatus::Completed { output_path } => {
                info!("Watermark export completed: {}", output_path.display());
                Ok(output_path)
            }
            ExportStatus::Failed { error } => Err(error),
            ExportStatus::Cancelled => Err(SukashiError::ExportCancelled),
        }
    }

    /// Apply the same watermark to every video file found under a
    /// directory. Per-file failures are logged and do not stop the batch.
    pub async fn watermark_directory(
        &self,
        input_dir: &Path,
        spec: &WatermarkSpec,
        show_progress: bool,
    ) -> Result<()> {
        info!("Processing directory: {}", input_dir.display());

        if !input_dir.is_dir() {
            return Err(SukashiError::Config("Input path is not a directory".to_string()));
        }

        let video_extensions = ["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm"];
        let mut video_files = Vec::new();

        for entry in WalkDir::new(input_dir).into_iter().filter_map(|e| e.ok()) {
            if let Some(extension) = entry.path().extension() {
                if let Some(ext_str) = extension.to_str() {
                    if video_extensions.contains(&ext_str.to_lowercase().as_str()) {
                        video_files.push(entry.path().to_path_buf());
                    }
                }
            }
        }

        info!("Found {} video files to process", video_files.len());

        for video_path in video_files {
            match self.add_watermark(&video_path, spec, show_progress).await {
                Ok(output_path) => info!(
                    "Successfully processed {} -> {}",
                    video_path.display(),
                    output_path.display()
                ),
                Err(e) => warn!("Failed to process {}: {}", video_path.display(), e),
            }
        }

        Ok(())
    }

    /// Probe a media file and return its asset description
    pub async fn probe(&self, path: &Path) -> Result<MediaAsset> {
        MediaSource::open(self.media.as_ref(), path).await
    }

    /// Version string of the media processing backend
    pub async fn version_info(&self) -> Result<String> {
        self.media.version_info().await
    }
}

/// Render export progress updates as a console bar until the job's
/// progress channel closes
fn spawn_progress_bar(
    mut progress: tokio::sync::watch::Receiver<crate::media::ExportProgress>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let bar = ProgressBar::new(100);
        if let Ok(style) =
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}")
        {
            bar.set_style(style);
        }

        while progress.changed().await.is_ok() {
            let update = *progress.borrow();
            bar.set_position((update.ratio * 100.0).round() as u64);
            bar.set_message(format!("{:.1}s", update.seconds));
        }

        bar.finish_and_clear();
    })
}
