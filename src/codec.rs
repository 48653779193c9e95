//! Pixel rectangle to normalized center-form conversion
//!
//! Pure geometry, no rounding and no clamping: a rectangle that leaves the
//! image produces values outside [0, 1] so bad input stays detectable.
//! Formatting to six decimals happens in `label_writer`.

use crate::geometry::PixelRect;

/// One detection label: class id plus center/size divided by image size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedLabel {
    pub class_id: u32,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
    /// Degrees, carried through unchanged in rotated mode
    pub angle: Option<f64>,
}

pub fn to_normalized(rect: &PixelRect, class_id: u32, image_size: (u32, u32)) -> NormalizedLabel {
    let (w, h) = (image_size.0 as f64, image_size.1 as f64);
    NormalizedLabel {
        class_id,
        x_center: (rect.x1 + rect.x2) / (2.0 * w),
        y_center: (rect.y1 + rect.y2) / (2.0 * h),
        width: (rect.x2 - rect.x1) / w,
        height: (rect.y2 - rect.y1) / h,
        angle: None,
    }
}

/// Same as `to_normalized`, plus the drag angle. A box without an angle
/// (drawn before rotated mode was enabled) is written with 0.
pub fn to_normalized_rotated(
    rect: &PixelRect,
    class_id: u32,
    image_size: (u32, u32),
) -> NormalizedLabel {
    NormalizedLabel {
        angle: Some(rect.angle.unwrap_or(0.0)),
        ..to_normalized(rect, class_id, image_size)
    }
}
