use serde::{Deserialize, Serialize};

/// Pixel dimensions of a frame or layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle in pixel units, origin at the top-left of the frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Whole-frame rectangle for a render size
    pub fn from_size(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    /// True when the rectangle lies entirely inside a frame of the given size
    pub fn fits_within(&self, size: Size) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.x + self.width <= size.width
            && self.y + self.height <= size.height
    }
}

/// Watermark position as fractions of the render size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Watermark dimensions in absolute pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeSpec {
    pub width: f64,
    pub height: f64,
}

/// Compute the watermark's destination rectangle within a frame.
///
/// `position` is interpreted as a fraction of the render size and `size` as
/// absolute pixels: `x = renderWidth * position.x`, `y = renderHeight *
/// position.y`, `w = size.width`, `h = size.height`. The result may extend
/// beyond the frame; callers decide whether that is worth warning about.
pub fn destination_rect(render_size: Size, position: Position, size: SizeSpec) -> Rect {
    Rect::new(
        render_size.width * position.x,
        render_size.height * position.y,
        size.width,
        size.height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_rect_fractional_position_absolute_size() {
        let rect = destination_rect(
            Size::new(1920.0, 1080.0),
            Position { x: 0.8, y: 0.8 },
            SizeSpec { width: 200.0, height: 200.0 },
        );
        assert_eq!(rect, Rect::new(1536.0, 864.0, 200.0, 200.0));
    }

    #[test]
    fn test_destination_rect_origin() {
        let rect = destination_rect(
            Size::new(1280.0, 720.0),
            Position { x: 0.0, y: 0.0 },
            SizeSpec { width: 64.0, height: 48.0 },
        );
        assert_eq!(rect, Rect::new(0.0, 0.0, 64.0, 48.0));
    }

    #[test]
    fn test_out_of_bounds_rect_is_computed_without_clamping() {
        let size = Size::new(1920.0, 1080.0);
        let rect = destination_rect(
            size,
            Position { x: 0.95, y: 0.95 },
            SizeSpec { width: 400.0, height: 400.0 },
        );
        assert_eq!(rect.x, 1824.0);
        assert_eq!(rect.y, 1026.0);
        assert!(!rect.fits_within(size));
    }

    #[test]
    fn test_fits_within() {
        let frame = Size::new(100.0, 100.0);
        assert!(Rect::new(0.0, 0.0, 100.0, 100.0).fits_within(frame));
        assert!(Rect::new(10.0, 10.0, 50.0, 50.0).fits_within(frame));
        assert!(!Rect::new(-1.0, 0.0, 50.0, 50.0).fits_within(frame));
        assert!(!Rect::new(60.0, 60.0, 50.0, 50.0).fits_within(frame));
    }
}
