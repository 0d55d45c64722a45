use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::debug;

use crate::error::{Result, SukashiError};

/// Abstract media processing command representation (ffmpeg/ffprobe)
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
    /// Expected output duration in seconds, used to turn encoder progress
    /// into a completion ratio
    pub expected_duration: Option<f64>,
}

/// A single progress update from a monitored encode
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExportProgress {
    /// Encoded output time in seconds
    pub seconds: f64,
    /// Fraction of the expected duration in [0, 1], 0 when unknown
    pub ratio: f64,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
            expected_duration: None,
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Copy audio stream
    pub fn copy_audio(self) -> Self {
        self.audio_codec("copy")
    }

    /// Disable audio
    pub fn no_audio(self) -> Self {
        self.arg("-an")
    }

    /// Add complex filter graph
    pub fn filter_complex<S: Into<String>>(self, graph: S) -> Self {
        self.arg("-filter_complex").arg(graph)
    }

    /// Map a stream or filter graph label into the output
    pub fn map<S: Into<String>>(self, selector: S) -> Self {
        self.arg("-map").arg(selector)
    }

    /// Set output frame rate
    pub fn frame_rate(self, fps: u32) -> Self {
        self.arg("-r").arg(fps.to_string())
    }

    /// Set output pixel format
    pub fn pixel_format<S: Into<String>>(self, format: S) -> Self {
        self.arg("-pix_fmt").arg(format)
    }

    /// Set output container format
    pub fn container<S: Into<String>>(self, format: S) -> Self {
        self.arg("-f").arg(format)
    }

    /// Record the expected output duration for progress reporting
    pub fn expected_duration(mut self, seconds: f64) -> Self {
        self.expected_duration = Some(seconds);
        self
    }

    /// Execute the command to completion and return its stdout
    pub async fn capture_output(&self) -> Result<String> {
        debug!("Executing media processing command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let output = tokio::process::Command::new(&self.binary_path)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SukashiError::Media(format!("Failed to execute media processor: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SukashiError::Media(format!(
                "{} failed: {}",
                self.description,
                stderr
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Execute the command with `-progress pipe:1` style output streamed
    /// from stdout, publishing parsed updates to `progress`.
    ///
    /// Exit by signal is reported as `ExportCancelled`; any other non-zero
    /// exit carries the captured stderr.
    pub async fn execute_monitored(
        &self,
        progress: watch::Sender<ExportProgress>,
    ) -> Result<()> {
        debug!("Executing monitored command: {} {:?}", self.binary_path, self.args);

        let mut child = tokio::process::Command::new(&self.binary_path)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SukashiError::Media(format!("Failed to execute media processor: {}", e)))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Drain stderr concurrently so the encoder never blocks on a full pipe
        let stderr_task = tokio::spawn(async move {
            let mut captured = String::new();
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    captured.push_str(&line);
                    captured.push('\n');
                }
            }
            captured
        });

        if let Some(stdout) = stdout {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(update) = parse_progress_line(&line, self.expected_duration) {
                    let _ = progress.send(update);
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| SukashiError::Media(format!("Failed to wait for media processor: {}", e)))?;

        let stderr_text = stderr_task.await.unwrap_or_default();

        if status.success() {
            Ok(())
        } else if status.code().is_none() {
            // Terminated by a signal: the pipeline was torn down, not broken
            Err(SukashiError::ExportCancelled)
        } else {
            Err(SukashiError::Export(format!(
                "{} failed: {}",
                self.description,
                tail(&stderr_text, 2048)
            )))
        }
    }
}

/// Parse a single `key=value` line of ffmpeg `-progress` output.
/// Only time advancement lines produce an update.
pub fn parse_progress_line(line: &str, expected_duration: Option<f64>) -> Option<ExportProgress> {
    let (key, value) = line.split_once('=')?;
    let seconds = match key.trim() {
        "out_time_us" | "out_time_ms" => {
            // Both keys carry microseconds in current ffmpeg builds
            value.trim().parse::<i64>().ok()? as f64 / 1_000_000.0
        }
        _ => return None,
    };

    let ratio = match expected_duration {
        Some(total) if total > 0.0 => (seconds / total).clamp(0.0, 1.0),
        _ => 0.0,
    };

    Some(ExportProgress { seconds, ratio })
}

/// Last `max_bytes` of a string, for keeping encoder error output readable
fn tail(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut start = text.len() - max_bytes;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

/// Builder for common media processing operations
pub struct MediaCommandBuilder {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S1: Into<String>, S2: Into<String>>(ffmpeg_path: S1, ffprobe_path: S2) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Build a stream/format probe command with JSON output
    pub fn probe<P: AsRef<Path>>(&self, input_path: P) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "Media probe")
            .arg("-v").arg("error")
            .arg("-print_format").arg("json")
            .arg("-show_format")
            .arg("-show_streams")
            .output(input_path)
    }

    /// Build encoder version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Version check")
            .arg("-version")
    }

    /// Build probe version check command
    pub fn probe_version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "Probe version check")
            .arg("-version")
    }

    /// Build custom command
    pub fn custom<S: Into<String>>(&self, description: S) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, description.into())
    }
}
