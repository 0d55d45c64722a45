use std::fmt;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use tracing::{debug, info, warn};

use crate::config::RenderConfig;
use crate::error::{Result, SukashiError};
use crate::geometry::{destination_rect, Position, Rect, Size, SizeSpec};
use crate::source::{MediaAsset, MediaTime, Track, TrackKind};

/// Caller-facing description of the watermark to apply.
///
/// `position` is a fraction of the source frame size; `size` is absolute
/// pixels. Immutable once parsed from the request.
#[derive(Debug, Clone)]
pub struct WatermarkSpec {
    pub image_path: PathBuf,
    pub position: Position,
    pub size: SizeSpec,
}

/// Half-open time range `[start, start + duration)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: MediaTime,
    pub duration: MediaTime,
}

impl TimeRange {
    pub fn from_zero(duration: MediaTime) -> Self {
        Self { start: MediaTime::ZERO, duration }
    }
}

/// A slice of a source track scheduled on the composition timeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackSegment {
    /// Range of the source track being referenced
    pub source_range: TimeRange,
    /// Composition time the slice is inserted at
    pub at: MediaTime,
}

/// Composition-level copy of a source track
#[derive(Debug, Clone)]
pub struct CompositionTrack {
    pub kind: TrackKind,
    /// Stream index of the source track this copy references
    pub source_index: usize,
    pub segments: Vec<TrackSegment>,
}

impl CompositionTrack {
    /// Create a track copy with the source's full `[0, duration)` range
    /// inserted at time zero. Fails when the source cannot provide a
    /// usable range (malformed or zero-duration asset).
    fn insert_full_range(source: &Track, duration: MediaTime) -> Result<Self> {
        if !duration.is_positive() {
            return Err(SukashiError::TrackCreation(format!(
                "Source {:?} track {} has no usable duration",
                source.kind, source.index
            )));
        }

        Ok(Self {
            kind: source.kind,
            source_index: source.index,
            segments: vec![TrackSegment {
                source_range: TimeRange::from_zero(duration),
                at: MediaTime::ZERO,
            }],
        })
    }

    /// Total scheduled duration of the track
    pub fn duration(&self) -> MediaTime {
        self.segments
            .iter()
            .map(|s| s.source_range.duration)
            .next()
            .unwrap_or(MediaTime::ZERO)
    }
}

/// Decoded watermark image with its pixel buffer cached for the layer
#[derive(Clone)]
pub struct WatermarkImage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub rgba: RgbaImage,
}

impl WatermarkImage {
    /// Decode a still image from disk. Any read or decode failure is an
    /// `ImageLoad` error; a blank or missing watermark is never substituted.
    pub fn load(path: &Path) -> Result<Self> {
        let decoded = image::open(path).map_err(|e| {
            SukashiError::ImageLoad(format!("{}: {}", path.display(), e))
        })?;

        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();

        debug!("Loaded watermark image {} ({}x{})", path.display(), width, height);

        Ok(Self {
            path: path.to_path_buf(),
            width,
            height,
            rgba,
        })
    }
}

impl fmt::Debug for WatermarkImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatermarkImage")
            .field("path", &self.path)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.as_raw().len())
            .finish()
    }
}

/// One layer of the render stack, bottom-up
#[derive(Debug, Clone)]
pub enum Layer {
    /// Base video layer at full render size
    Video { frame: Rect },
    /// Static watermark image at its destination rectangle
    Watermark {
        frame: Rect,
        opacity: f32,
        image: WatermarkImage,
    },
}

/// Timing instruction referencing the composition video track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingInstruction {
    pub time_range: TimeRange,
}

/// Everything the renderer needs: frame size, frame rate, layer stack and
/// timing instructions
#[derive(Debug, Clone)]
pub struct RenderDescription {
    pub render_size: Size,
    pub frame_rate: u32,
    pub layers: Vec<Layer>,
    pub instructions: Vec<TimingInstruction>,
}

/// Synthetic, in-memory timeline referencing slices of the source tracks,
/// used as the render source for export
#[derive(Debug, Clone)]
pub struct Composition {
    pub source_path: PathBuf,
    pub duration: MediaTime,
    pub video_track: CompositionTrack,
    pub audio_track: Option<CompositionTrack>,
    pub render: RenderDescription,
}

impl Composition {
    pub fn has_audio(&self) -> bool {
        self.audio_track.is_some()
    }

    /// The watermark layer of the render stack
    pub fn watermark_layer(&self) -> Option<(&Rect, f32, &WatermarkImage)> {
        self.render.layers.iter().find_map(|layer| match layer {
            Layer::Watermark { frame, opacity, image } => Some((frame, *opacity, image)),
            Layer::Video { .. } => None,
        })
    }
}

/// Builds time-aligned compositions from a source asset and a watermark
pub struct Compositor {
    render_config: RenderConfig,
}

impl Compositor {
    pub fn new(render_config: RenderConfig) -> Self {
        Self { render_config }
    }

    /// Build a composition: full-range video and (best-effort) audio track
    /// copies, the decoded watermark layer at its destination rectangle,
    /// and a single timing instruction spanning the whole timeline.
    pub fn build(&self, asset: &MediaAsset, watermark: &WatermarkSpec) -> Result<Composition> {
        let video_source = asset.video_track().ok_or_else(|| {
            SukashiError::TrackCreation(format!(
                "No video track in {}",
                asset.path.display()
            ))
        })?;

        let render_size = video_source.natural_size.ok_or_else(|| {
            SukashiError::TrackCreation(format!(
                "Video track {} carries no frame dimensions",
                video_source.index
            ))
        })?;

        let video_track = CompositionTrack::insert_full_range(video_source, asset.duration)?;

        // Audio is best-effort: a source without usable audio still
        // produces a valid video-only composition.
        let audio_track = match asset.audio_track() {
            Some(audio_source) => {
                match CompositionTrack::insert_full_range(audio_source, asset.duration) {
                    Ok(track) => Some(track),
                    Err(e) => {
                        warn!("Skipping audio track: {}", e);
                        None
                    }
                }
            }
            None => None,
        };

        let image = WatermarkImage::load(&watermark.image_path)?;

        let frame = destination_rect(render_size, watermark.position, watermark.size);
        if !frame.fits_within(render_size) {
            warn!(
                "Watermark rectangle {:?} extends beyond the {}x{} frame",
                frame, render_size.width, render_size.height
            );
        }

        let opacity = self.render_config.watermark_opacity;
        let layers = vec![
            Layer::Video { frame: Rect::from_size(render_size) },
            Layer::Watermark { frame, opacity, image },
        ];

        let instructions = vec![TimingInstruction {
            time_range: TimeRange::from_zero(asset.duration),
        }];

        info!(
            "Built composition for {}: {}x{} @ {} fps, watermark at ({:.0}, {:.0}) {}x{}, audio: {}",
            asset.path.display(),
            render_size.width,
            render_size.height,
            self.render_config.frame_rate,
            frame.x,
            frame.y,
            frame.width,
            frame.height,
            audio_track.is_some()
        );

        Ok(Composition {
            source_path: asset.path.clone(),
            duration: asset.duration,
            video_track,
            audio_track,
            render: RenderDescription {
                render_size,
                frame_rate: self.render_config.frame_rate,
                layers,
                instructions,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video_track(size: Option<Size>) -> Track {
        Track {
            index: 0,
            kind: TrackKind::Video,
            codec: Some("h264".to_string()),
            natural_size: size,
            duration: Some(MediaTime::new(900_000, 90_000)),
            frame_rate: Some(30.0),
        }
    }

    fn audio_track() -> Track {
        Track {
            index: 1,
            kind: TrackKind::Audio,
            codec: Some("aac".to_string()),
            natural_size: None,
            duration: Some(MediaTime::new(441_000, 44_100)),
            frame_rate: None,
        }
    }

    fn asset(tracks: Vec<Track>, duration: MediaTime) -> MediaAsset {
        MediaAsset {
            path: PathBuf::from("/clip.mp4"),
            duration,
            tracks,
        }
    }

    fn write_watermark_png(dir: &Path) -> PathBuf {
        let path = dir.join("mark.png");
        let img = RgbaImage::from_pixel(8, 8, image::Rgba([255, 0, 0, 128]));
        img.save(&path).unwrap();
        path
    }

    fn spec(image_path: PathBuf) -> WatermarkSpec {
        WatermarkSpec {
            image_path,
            position: Position { x: 0.8, y: 0.8 },
            size: SizeSpec { width: 200.0, height: 200.0 },
        }
    }

    fn compositor() -> Compositor {
        Compositor::new(RenderConfig {
            frame_rate: 30,
            watermark_opacity: 0.8,
        })
    }

    #[test]
    fn test_build_full_composition() {
        let dir = tempfile::tempdir().unwrap();
        let wm = write_watermark_png(dir.path());
        let duration = MediaTime::new(900_000, 90_000);
        let asset = asset(
            vec![video_track(Some(Size::new(1920.0, 1080.0))), audio_track()],
            duration,
        );

        let composition = compositor().build(&asset, &spec(wm)).unwrap();

        // Composition duration equals the source video track duration
        assert_eq!(composition.duration, duration);
        assert_eq!(composition.video_track.duration(), duration);
        assert_eq!(composition.render.render_size, Size::new(1920.0, 1080.0));
        assert_eq!(composition.render.frame_rate, 30);
        assert!(composition.has_audio());

        assert_eq!(composition.render.instructions.len(), 1);
        assert_eq!(
            composition.render.instructions[0].time_range,
            TimeRange::from_zero(duration)
        );

        // Layer stack is base video then watermark
        assert_eq!(composition.render.layers.len(), 2);
        assert!(matches!(composition.render.layers[0], Layer::Video { .. }));
        let (frame, opacity, image) = composition.watermark_layer().unwrap();
        assert_eq!(*frame, Rect::new(1536.0, 864.0, 200.0, 200.0));
        assert_eq!(opacity, 0.8);
        assert_eq!((image.width, image.height), (8, 8));
        assert!(!image.rgba.as_raw().is_empty());
    }

    #[test]
    fn test_build_without_audio_track() {
        let dir = tempfile::tempdir().unwrap();
        let wm = write_watermark_png(dir.path());
        let asset = asset(
            vec![video_track(Some(Size::new(1280.0, 720.0)))],
            MediaTime::from_seconds(5.0),
        );

        let composition = compositor().build(&asset, &spec(wm)).unwrap();
        assert!(!composition.has_audio());
        assert_eq!(composition.render.layers.len(), 2);
    }

    #[test]
    fn test_zero_duration_asset_fails_track_creation() {
        let dir = tempfile::tempdir().unwrap();
        let wm = write_watermark_png(dir.path());
        let asset = asset(
            vec![video_track(Some(Size::new(1280.0, 720.0)))],
            MediaTime::ZERO,
        );

        let err = compositor().build(&asset, &spec(wm)).unwrap_err();
        assert!(matches!(err, SukashiError::TrackCreation(_)));
    }

    #[test]
    fn test_missing_frame_dimensions_fail_track_creation() {
        let dir = tempfile::tempdir().unwrap();
        let wm = write_watermark_png(dir.path());
        let asset = asset(vec![video_track(None)], MediaTime::from_seconds(5.0));

        let err = compositor().build(&asset, &spec(wm)).unwrap_err();
        assert!(matches!(err, SukashiError::TrackCreation(_)));
    }

    #[test]
    fn test_unreadable_watermark_fails_image_load() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("not-an-image.png");
        std::fs::write(&bogus, b"definitely not image data").unwrap();
        let asset = asset(
            vec![video_track(Some(Size::new(1280.0, 720.0)))],
            MediaTime::from_seconds(5.0),
        );

        let err = compositor().build(&asset, &spec(bogus)).unwrap_err();
        assert!(matches!(err, SukashiError::ImageLoad(_)));

        let missing = dir.path().join("missing.png");
        let err = compositor().build(&asset, &spec(missing)).unwrap_err();
        assert!(matches!(err, SukashiError::ImageLoad(_)));
    }

    #[test]
    fn test_out_of_bounds_watermark_is_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let wm = write_watermark_png(dir.path());
        let asset = asset(
            vec![video_track(Some(Size::new(640.0, 480.0)))],
            MediaTime::from_seconds(5.0),
        );

        // 200x200 at (512, 384) spills past 640x480; build must not clamp
        let composition = compositor().build(&asset, &spec(wm)).unwrap();
        let (frame, _, _) = composition.watermark_layer().unwrap();
        assert_eq!(*frame, Rect::new(512.0, 384.0, 200.0, 200.0));
    }
}
