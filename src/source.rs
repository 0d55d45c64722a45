use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Result, SukashiError};
use crate::geometry::Size;
use crate::media::{parse_fraction, MediaProcessorTrait, ProbeOutput, ProbeStream};

/// Rational time value: `value / timescale` seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaTime {
    pub value: i64,
    pub timescale: i64,
}

impl MediaTime {
    pub const ZERO: MediaTime = MediaTime { value: 0, timescale: 1 };

    /// Timescale used when only a decimal seconds value is known
    const MICROSECONDS: i64 = 1_000_000;

    pub fn new(value: i64, timescale: i64) -> Self {
        Self { value, timescale }
    }

    pub fn from_seconds(seconds: f64) -> Self {
        Self {
            value: (seconds * Self::MICROSECONDS as f64).round() as i64,
            timescale: Self::MICROSECONDS,
        }
    }

    pub fn as_seconds(&self) -> f64 {
        if self.timescale == 0 {
            return 0.0;
        }
        self.value as f64 / self.timescale as f64
    }

    pub fn is_positive(&self) -> bool {
        self.as_seconds() > 0.0
    }
}

/// Media kind of a single timed stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
}

/// A single timed stream within an asset
#[derive(Debug, Clone)]
pub struct Track {
    /// Stream index within the container
    pub index: usize,
    pub kind: TrackKind,
    pub codec: Option<String>,
    /// Frame dimensions, present on video tracks
    pub natural_size: Option<Size>,
    pub duration: Option<MediaTime>,
    pub frame_rate: Option<f64>,
}

/// Source media handle: path, duration and track set. Read-only once
/// opened; decode resources live in the probe/encode child processes, so
/// the asset itself holds no handles to release.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    pub path: PathBuf,
    pub duration: MediaTime,
    pub tracks: Vec<Track>,
}

impl MediaAsset {
    /// First video track, by kind
    pub fn video_track(&self) -> Option<&Track> {
        self.tracks.iter().find(|t| t.kind == TrackKind::Video)
    }

    /// First audio track, by kind
    pub fn audio_track(&self) -> Option<&Track> {
        self.tracks.iter().find(|t| t.kind == TrackKind::Audio)
    }

    /// Natural frame size of the first video track
    pub fn natural_size(&self) -> Option<Size> {
        self.video_track().and_then(|t| t.natural_size)
    }
}

pub struct MediaSource;

impl MediaSource {
    /// Open a video file and expose its tracks, natural frame size and
    /// duration. Fails with `FileNotFound` for a missing path and
    /// `Undecodable` when no video track exists.
    pub async fn open(processor: &dyn MediaProcessorTrait, path: &Path) -> Result<MediaAsset> {
        if !path.exists() {
            return Err(SukashiError::FileNotFound(path.display().to_string()));
        }

        let probe = processor.probe(path).await?;
        let asset = Self::from_probe(path, &probe)?;

        info!(
            "Opened media source {} ({} tracks, {:.3}s)",
            path.display(),
            asset.tracks.len(),
            asset.duration.as_seconds()
        );

        Ok(asset)
    }

    /// Map probe output to an asset. Pure, so undecodable and edge-case
    /// containers can be exercised without an ffprobe binary.
    pub fn from_probe(path: &Path, probe: &ProbeOutput) -> Result<MediaAsset> {
        let tracks: Vec<Track> = probe
            .streams
            .iter()
            .filter_map(map_stream)
            .collect();

        let video_track = tracks
            .iter()
            .find(|t| t.kind == TrackKind::Video)
            .ok_or_else(|| {
                SukashiError::Undecodable(format!(
                    "No decodable video track in {}",
                    path.display()
                ))
            })?;

        // Duration of the source is the video track's duration; the
        // container duration is a fallback for streams that do not carry
        // their own.
        let duration = video_track
            .duration
            .or_else(|| {
                probe
                    .format
                    .duration
                    .as_deref()
                    .and_then(|d| d.parse::<f64>().ok())
                    .map(MediaTime::from_seconds)
            })
            .unwrap_or(MediaTime::ZERO);

        debug!(
            "Probed {}: video stream {}, duration {:.3}s",
            path.display(),
            video_track.index,
            duration.as_seconds()
        );

        Ok(MediaAsset {
            path: path.to_path_buf(),
            duration,
            tracks,
        })
    }
}

fn map_stream(stream: &ProbeStream) -> Option<Track> {
    let kind = if stream.is_video() {
        TrackKind::Video
    } else if stream.is_audio() {
        TrackKind::Audio
    } else {
        return None;
    };

    let natural_size = match (kind, stream.width, stream.height) {
        (TrackKind::Video, Some(w), Some(h)) => Some(Size::new(w as f64, h as f64)),
        _ => None,
    };

    let duration = stream_duration(stream);

    let frame_rate = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_fraction)
        .map(|(num, den)| num as f64 / den as f64);

    Some(Track {
        index: stream.index,
        kind,
        codec: stream.codec_name.clone(),
        natural_size,
        duration,
        frame_rate,
    })
}

/// Stream duration, preferring the exact rational (`duration_ts` in
/// `time_base` units) over the decimal seconds string.
fn stream_duration(stream: &ProbeStream) -> Option<MediaTime> {
    if let (Some(ts), Some(base)) = (stream.duration_ts, stream.time_base.as_deref()) {
        if let Some((num, den)) = parse_fraction(base) {
            // time_base numerators other than 1 are rare; fold them in
            return Some(MediaTime::new(ts * num, den));
        }
    }

    stream
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .map(MediaTime::from_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{ProbeFormat, ProbeOutput, ProbeStream};

    fn video_stream() -> ProbeStream {
        ProbeStream {
            index: 0,
            codec_type: "video".to_string(),
            codec_name: Some("h264".to_string()),
            width: Some(1920),
            height: Some(1080),
            time_base: Some("1/90000".to_string()),
            duration_ts: Some(900_000),
            duration: Some("10.000000".to_string()),
            avg_frame_rate: Some("30/1".to_string()),
            sample_rate: None,
            channels: None,
        }
    }

    fn audio_stream() -> ProbeStream {
        ProbeStream {
            index: 1,
            codec_type: "audio".to_string(),
            codec_name: Some("aac".to_string()),
            width: None,
            height: None,
            time_base: Some("1/44100".to_string()),
            duration_ts: Some(441_000),
            duration: Some("10.000000".to_string()),
            avg_frame_rate: None,
            sample_rate: Some("44100".to_string()),
            channels: Some(2),
        }
    }

    fn probe_with(streams: Vec<ProbeStream>) -> ProbeOutput {
        ProbeOutput {
            streams,
            format: ProbeFormat {
                format_name: Some("mov,mp4,m4a,3gp,3g2,mj2".to_string()),
                duration: Some("10.023000".to_string()),
            },
        }
    }

    #[test]
    fn test_from_probe_selects_tracks_by_kind() {
        let probe = probe_with(vec![video_stream(), audio_stream()]);
        let asset = MediaSource::from_probe(Path::new("/clip.mp4"), &probe).unwrap();

        assert_eq!(asset.tracks.len(), 2);
        let video = asset.video_track().unwrap();
        assert_eq!(video.index, 0);
        assert_eq!(video.natural_size, Some(Size::new(1920.0, 1080.0)));
        assert_eq!(video.frame_rate, Some(30.0));
        assert_eq!(asset.audio_track().unwrap().index, 1);
    }

    #[test]
    fn test_duration_prefers_video_track_rational() {
        let probe = probe_with(vec![video_stream(), audio_stream()]);
        let asset = MediaSource::from_probe(Path::new("/clip.mp4"), &probe).unwrap();

        // 900000 ticks at 1/90000, not the container's 10.023s
        assert_eq!(asset.duration, MediaTime::new(900_000, 90_000));
        assert_eq!(asset.duration.as_seconds(), 10.0);
    }

    #[test]
    fn test_duration_falls_back_to_container() {
        let mut stream = video_stream();
        stream.time_base = None;
        stream.duration_ts = None;
        stream.duration = None;
        let probe = probe_with(vec![stream]);
        let asset = MediaSource::from_probe(Path::new("/clip.mp4"), &probe).unwrap();

        assert!((asset.duration.as_seconds() - 10.023).abs() < 1e-6);
    }

    #[test]
    fn test_no_video_track_is_undecodable() {
        let probe = probe_with(vec![audio_stream()]);
        let err = MediaSource::from_probe(Path::new("/audio.m4a"), &probe).unwrap_err();
        assert!(matches!(err, SukashiError::Undecodable(_)));
    }

    #[test]
    fn test_non_media_streams_are_skipped() {
        let mut data = video_stream();
        data.index = 2;
        data.codec_type = "data".to_string();
        let probe = probe_with(vec![video_stream(), data]);
        let asset = MediaSource::from_probe(Path::new("/clip.mp4"), &probe).unwrap();
        assert_eq!(asset.tracks.len(), 1);
    }

    #[tokio::test]
    async fn test_open_missing_file_is_file_not_found() {
        let processor = crate::media::MockMediaProcessorTrait::new();
        let err = MediaSource::open(&processor, Path::new("/definitely/missing.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, SukashiError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_open_probes_existing_file() {
        use assert_fs::prelude::*;

        let file = assert_fs::NamedTempFile::new("clip.mp4").unwrap();
        file.touch().unwrap();

        let mut processor = crate::media::MockMediaProcessorTrait::new();
        processor
            .expect_probe()
            .times(1)
            .returning(|_| Ok(probe_with(vec![video_stream(), audio_stream()])));

        let asset = MediaSource::open(&processor, file.path()).await.unwrap();
        assert_eq!(asset.path, file.path());
        assert!(asset.duration.is_positive());
    }

    #[test]
    fn test_media_time_conversions() {
        assert_eq!(MediaTime::ZERO.as_seconds(), 0.0);
        assert!(!MediaTime::ZERO.is_positive());
        assert_eq!(MediaTime::from_seconds(1.5).as_seconds(), 1.5);
        assert_eq!(MediaTime::new(30_000, 1_000).as_seconds(), 30.0);
    }
}
