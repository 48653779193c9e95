//! Points, rectangles and the display scale
//!
//! Pointer events arrive in the space of the bitmap on screen, which may be a
//! downscaled copy of the file on disk. Every point and rectangle carries its
//! space as a type parameter so the two can't be mixed up; the only crossing is
//! `DisplayScale::to_original` (ingestion) and `DisplayScale::to_display`
//! (rendering).

use std::fmt;
use std::marker::PhantomData;

/// Runtime name of a coordinate space, used for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSpace {
    Display,
    Original,
}

impl fmt::Display for CoordinateSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinateSpace::Display => write!(f, "display"),
            CoordinateSpace::Original => write!(f, "original"),
        }
    }
}

pub trait Space: Copy + fmt::Debug + PartialEq {
    const SPACE: CoordinateSpace;
}

/// Pixels of the (possibly resized) bitmap shown to the user
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySpace;

/// Native pixel grid of the image file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OriginalSpace;

impl Space for DisplaySpace {
    const SPACE: CoordinateSpace = CoordinateSpace::Display;
}

impl Space for OriginalSpace {
    const SPACE: CoordinateSpace = CoordinateSpace::Original;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point<S: Space> {
    pub x: f64,
    pub y: f64,
    _space: PhantomData<S>,
}

impl<S: Space> Point<S> {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, _space: PhantomData }
    }

    pub fn space(&self) -> CoordinateSpace {
        S::SPACE
    }
}

impl<S: Space> fmt::Display for Point<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})@{}", self.x, self.y, S::SPACE)
    }
}

/// Corner-form rectangle, `x1 <= x2` and `y1 <= y2`.
///
/// `angle` is only set for boxes drawn in rotated mode: the direction of the
/// drag vector in degrees, as returned by `atan2`, never normalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect<S: Space> {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub angle: Option<f64>,
    _space: PhantomData<S>,
}

/// A box in original image pixels; the only form ever persisted
pub type PixelRect = Rect<OriginalSpace>;

/// A box in on-screen pixels; only used for drawing
pub type DisplayRect = Rect<DisplaySpace>;

impl<S: Space> Rect<S> {
    /// Builds a rectangle from two opposite corners in any order
    pub fn from_corners(a: Point<S>, b: Point<S>) -> Self {
        Self {
            x1: a.x.min(b.x),
            y1: a.y.min(b.y),
            x2: a.x.max(b.x),
            y2: a.y.max(b.y),
            angle: None,
            _space: PhantomData,
        }
    }

    /// Builds a rectangle from already ordered edges; out-of-order input is
    /// kept as given so malformed geometry stays visible downstream.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2, angle: None, _space: PhantomData }
    }

    pub fn with_angle(mut self, angle: Option<f64>) -> Self {
        self.angle = angle;
        self
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// True when `p` lies strictly inside, edges excluded
    pub fn contains_strictly(&self, p: Point<S>) -> bool {
        self.x1 < p.x && p.x < self.x2 && self.y1 < p.y && p.y < self.y2
    }

    /// Same size and angle, upper-left corner moved to `(x1, y1)`
    pub fn moved_to(&self, x1: f64, y1: f64) -> Self {
        Self {
            x1,
            y1,
            x2: x1 + self.width(),
            y2: y1 + self.height(),
            angle: self.angle,
            _space: PhantomData,
        }
    }

    pub fn space(&self) -> CoordinateSpace {
        S::SPACE
    }
}

impl<S: Space> fmt::Display for Rect<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) to ({}, {})", self.x1, self.y1, self.x2, self.y2)?;
        if let Some(angle) = self.angle {
            write!(f, " at {angle:.1}°")?;
        }
        write!(f, " [{}]", S::SPACE)
    }
}

/// Uniform factor between original pixels and the bitmap shown on screen.
///
/// Computed once per image. `factor <= 1.0`; images that already fit inside
/// the configured maximum are shown at their native size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayScale {
    factor: f64,
    original_size: (u32, u32),
}

impl DisplayScale {
    pub fn for_image(width: u32, height: u32, max_width: u32, max_height: u32) -> Self {
        let factor = if width > max_width || height > max_height {
            (max_width as f64 / width as f64).min(max_height as f64 / height as f64)
        } else {
            1.0
        };
        Self { factor, original_size: (width, height) }
    }

    /// No resizing; display space and original space coincide
    #[cfg(test)]
    pub fn identity(width: u32, height: u32) -> Self {
        Self { factor: 1.0, original_size: (width, height) }
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn is_resized(&self) -> bool {
        self.factor < 1.0
    }

    pub fn original_size(&self) -> (u32, u32) {
        self.original_size
    }

    /// Size of the bitmap shown on screen (truncated like an integer resize)
    pub fn display_size(&self) -> (u32, u32) {
        let (w, h) = self.original_size;
        (
            ((w as f64 * self.factor) as u32).max(1),
            ((h as f64 * self.factor) as u32).max(1),
        )
    }

    pub fn to_original(&self, p: Point<DisplaySpace>) -> Point<OriginalSpace> {
        Point::new(p.x / self.factor, p.y / self.factor)
    }

    pub fn to_display(&self, rect: &PixelRect) -> DisplayRect {
        Rect::new(
            rect.x1 * self.factor,
            rect.y1 * self.factor,
            rect.x2 * self.factor,
            rect.y2 * self.factor,
        )
        .with_angle(rect.angle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_only_when_exceeding_limits() {
        let small = DisplayScale::for_image(640, 480, 800, 800);
        assert_eq!(small.factor(), 1.0);
        assert!(!small.is_resized());
        assert_eq!(small.display_size(), (640, 480));

        let wide = DisplayScale::for_image(1600, 400, 800, 800);
        assert_eq!(wide.factor(), 0.5);
        assert_eq!(wide.display_size(), (800, 200));

        let tall = DisplayScale::for_image(1000, 2000, 800, 800);
        assert_eq!(tall.factor(), 0.4);
        assert_eq!(tall.display_size(), (400, 800));
    }

    #[test]
    fn test_display_to_original_and_back() {
        let scale = DisplayScale::for_image(1600, 1200, 800, 800);
        let p = scale.to_original(Point::new(100.0, 50.0));
        assert_eq!((p.x, p.y), (200.0, 100.0));
        assert_eq!(p.space(), CoordinateSpace::Original);

        let rect = PixelRect::new(200.0, 100.0, 400.0, 300.0).with_angle(Some(45.0));
        let shown = scale.to_display(&rect);
        assert_eq!((shown.x1, shown.y1, shown.x2, shown.y2), (100.0, 50.0, 200.0, 150.0));
        assert_eq!(shown.angle, Some(45.0));
        assert_eq!(shown.space(), CoordinateSpace::Display);
    }

    #[test]
    fn test_rect_from_corners_orders_edges() {
        let rect = PixelRect::from_corners(Point::new(30.0, 5.0), Point::new(10.0, 25.0));
        assert_eq!((rect.x1, rect.y1, rect.x2, rect.y2), (10.0, 5.0, 30.0, 25.0));
        assert_eq!(rect.width(), 20.0);
        assert_eq!(rect.height(), 20.0);
    }

    #[test]
    fn test_contains_strictly_excludes_edges() {
        let rect = PixelRect::new(10.0, 10.0, 20.0, 20.0);
        assert!(rect.contains_strictly(Point::new(15.0, 15.0)));
        assert!(!rect.contains_strictly(Point::new(10.0, 15.0)));
        assert!(!rect.contains_strictly(Point::new(15.0, 20.0)));
        assert!(!rect.contains_strictly(Point::new(25.0, 15.0)));
    }

    #[test]
    fn test_moved_to_keeps_size_and_angle() {
        let rect = PixelRect::new(10.0, 10.0, 30.0, 20.0).with_angle(Some(-90.0));
        let moved = rect.moved_to(100.0, 50.0);
        assert_eq!((moved.x1, moved.y1, moved.x2, moved.y2), (100.0, 50.0, 120.0, 60.0));
        assert_eq!(moved.angle, Some(-90.0));
    }
}
