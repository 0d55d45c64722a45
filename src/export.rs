use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::compose::Composition;
use crate::config::MediaConfig;
use crate::error::{Result, SukashiError};
use crate::media::{ExportProgress, MediaCommand, MediaProcessorTrait};

/// Named bundle of encoding parameters applied uniformly to a render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportPreset {
    /// Highest quality H.264 encode. The only preset the pipeline selects;
    /// quality/bitrate tuning is out of scope.
    #[default]
    HighestQuality,
    /// Fast encode for previews
    Fast,
}

impl ExportPreset {
    fn encoder_args(&self) -> &'static [&'static str] {
        match self {
            ExportPreset::HighestQuality => &["-crf", "18", "-preset", "slow"],
            ExportPreset::Fast => &["-preset", "ultrafast"],
        }
    }
}

/// Terminal result of an export job
#[derive(Debug)]
pub enum ExportStatus {
    /// Output file exists and is fully written
    Completed { output_path: PathBuf },
    Failed { error: SukashiError },
    Cancelled,
}

/// Export job lifecycle. Terminal states are final; no retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Caller's view of a running export: a progress stream and a single
/// terminal status
pub struct ExportHandle {
    pub job_id: Uuid,
    progress: watch::Receiver<ExportProgress>,
    done: oneshot::Receiver<ExportStatus>,
}

impl ExportHandle {
    /// Subscribe to progress updates
    pub fn progress(&self) -> watch::Receiver<ExportProgress> {
        self.progress.clone()
    }

    /// Wait for the terminal status. Resolves to `Failed` if the job was
    /// torn down before delivering a result, rather than hanging.
    pub async fn wait(self) -> ExportStatus {
        match self.done.await {
            Ok(status) => status,
            Err(_) => ExportStatus::Failed {
                error: SukashiError::Export("export session no longer available".to_string()),
            },
        }
    }
}

/// One export run. Owns its encoder invocation; no two jobs share state.
struct ExportJob {
    id: Uuid,
    state: JobState,
    created_at: DateTime<Utc>,
    command: MediaCommand,
    staging_path: PathBuf,
    output_path: PathBuf,
}

impl ExportJob {
    fn transition(&mut self, next: JobState) {
        debug!("Export job {}: {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
    }

    async fn run(
        mut self,
        processor: Arc<dyn MediaProcessorTrait>,
        progress: watch::Sender<ExportProgress>,
    ) -> ExportStatus {
        self.transition(JobState::Running);

        let result = processor
            .execute_monitored(self.command.clone(), progress)
            .await;

        match result {
            Ok(()) => {
                // Atomic visibility: the output name only appears once the
                // encoder finished writing the staging file.
                match tokio::fs::rename(&self.staging_path, &self.output_path).await {
                    Ok(()) => {
                        self.transition(JobState::Completed);
                        let elapsed = Utc::now().signed_duration_since(self.created_at);
                        info!(
                            "Export job {} completed in {}ms: {}",
                            self.id,
                            elapsed.num_milliseconds(),
                            self.output_path.display()
                        );
                        ExportStatus::Completed { output_path: self.output_path.clone() }
                    }
                    Err(e) => {
                        self.transition(JobState::Failed);
                        self.discard_staging().await;
                        ExportStatus::Failed {
                            error: SukashiError::Export(format!(
                                "Failed to finalize output file: {}",
                                e
                            )),
                        }
                    }
                }
            }
            Err(SukashiError::ExportCancelled) => {
                self.transition(JobState::Cancelled);
                self.discard_staging().await;
                warn!("Export job {} was cancelled", self.id);
                ExportStatus::Cancelled
            }
            Err(error) => {
                self.transition(JobState::Failed);
                self.discard_staging().await;
                warn!("Export job {} failed: {}", self.id, error);
                ExportStatus::Failed { error }
            }
        }
    }

    async fn discard_staging(&self) {
        if let Err(e) = tokio::fs::remove_file(&self.staging_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "Could not remove staging file {}: {}",
                    self.staging_path.display(),
                    e
                );
            }
        }
    }
}

/// Drives asynchronous render+encode of compositions to MP4 files
pub struct Exporter {
    processor: Arc<dyn MediaProcessorTrait>,
    media_config: MediaConfig,
    preset: ExportPreset,
}

impl Exporter {
    pub fn new(processor: Arc<dyn MediaProcessorTrait>, media_config: MediaConfig) -> Self {
        Self {
            processor,
            media_config,
            preset: ExportPreset::default(),
        }
    }

    pub fn with_preset(mut self, preset: ExportPreset) -> Self {
        self.preset = preset;
        self
    }

    /// Start rendering a composition to `output_path` on a background
    /// task. Returns immediately; the terminal status arrives through the
    /// handle.
    pub fn export(&self, composition: &Composition, output_path: PathBuf) -> Result<ExportHandle> {
        let staging_path = staging_path_for(&output_path);
        let command =
            build_export_command(&self.media_config, self.preset, composition, &staging_path)?;

        let job = ExportJob {
            id: Uuid::new_v4(),
            state: JobState::Pending,
            created_at: Utc::now(),
            command,
            staging_path,
            output_path,
        };

        info!(
            "Export job {} pending: {} -> {}",
            job.id,
            composition.source_path.display(),
            job.output_path.display()
        );

        let (progress_tx, progress_rx) = watch::channel(ExportProgress::default());
        let (done_tx, done_rx) = oneshot::channel();
        let processor = Arc::clone(&self.processor);
        let job_id = job.id;

        tokio::spawn(async move {
            let status = job.run(processor, progress_tx).await;
            // Receiver may be gone when the caller stopped waiting
            let _ = done_tx.send(status);
        });

        Ok(ExportHandle {
            job_id,
            progress: progress_rx,
            done: done_rx,
        })
    }
}

/// Freshly generated UUID-named output path. Each call gets its own file,
/// so concurrent exports never collide on the filesystem namespace.
pub fn unique_output_path(output_dir: &Path) -> PathBuf {
    output_dir.join(format!("{}.mp4", Uuid::new_v4()))
}

/// Staging path next to the final output; renamed over on success
fn staging_path_for(output_path: &Path) -> PathBuf {
    let mut name = output_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "export.mp4".to_string());
    name.push_str(".part");
    output_path.with_file_name(name)
}

/// Build the encoder invocation that renders a composition: the watermark
/// scaled to its destination size and composited at its position with the
/// layer opacity, the base video re-encoded at the render frame rate, and
/// the composition audio stream-copied when present.
fn build_export_command(
    media_config: &MediaConfig,
    preset: ExportPreset,
    composition: &Composition,
    staging_path: &Path,
) -> Result<MediaCommand> {
    let (frame, opacity, image) = composition.watermark_layer().ok_or_else(|| {
        SukashiError::Export("Composition carries no watermark layer".to_string())
    })?;

    let scale_width = (frame.width.round() as i64).max(1);
    let scale_height = (frame.height.round() as i64).max(1);
    let x = frame.x.round() as i64;
    let y = frame.y.round() as i64;

    let graph = format!(
        "[1:v]scale={}:{},format=rgba,colorchannelmixer=aa={:.3}[wm];[0:v][wm]overlay=x={}:y={}[vout]",
        scale_width, scale_height, opacity, x, y
    );

    let mut command = MediaCommand::new(&media_config.ffmpeg_path, "Watermark export")
        .overwrite()
        .arg("-progress").arg("pipe:1")
        .arg("-nostats")
        .input(&composition.source_path)
        .input(&image.path)
        .filter_complex(graph)
        .map("[vout]");

    command = match &composition.audio_track {
        Some(audio) => command.map(format!("0:{}", audio.source_index)).copy_audio(),
        None => command.no_audio(),
    };

    command = command
        .video_codec("libx264")
        .args(preset.encoder_args().iter().copied())
        .pixel_format("yuv420p")
        .frame_rate(composition.render.frame_rate)
        .arg("-movflags").arg("+faststart")
        .args(media_config.encode_options.iter().cloned())
        .container("mp4")
        .expected_duration(composition.duration.as_seconds());

    Ok(command.output(staging_path))
}
