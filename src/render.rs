//! Draws redraw frames onto the display-sized bitmap.
//!
//! The annotation loop itself never touches pixels; a `Redraw` effect carries
//! a `Frame` in display space and, when a preview path is configured, the
//! runner hands it to `PreviewRenderer` which writes the composed image.

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

#[allow(unused_imports)]
use log::{debug, warn};

use crate::controller::Frame;
use crate::error::{Error, Result};
use crate::geometry::{DisplayRect, DisplayScale};

pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const LINE_WIDTH: u32 = 2;

pub struct PreviewRenderer {
    base: RgbImage,
    path: PathBuf,
}

impl PreviewRenderer {
    /// Scales `image` down to the display size once; frames are drawn on copies
    pub fn new(image: &DynamicImage, scale: &DisplayScale, path: &Path) -> Self {
        let base = if scale.is_resized() {
            let (width, height) = scale.display_size();
            image.resize_exact(width, height, FilterType::Triangle).to_rgb8()
        } else {
            image.to_rgb8()
        };
        Self { base, path: path.to_path_buf() }
    }

    pub fn size(&self) -> (u32, u32) {
        self.base.dimensions()
    }

    pub fn render(&self, frame: &Frame) -> RgbImage {
        let mut canvas = self.base.clone();
        for rect in frame.boxes.iter().chain(frame.live.iter()) {
            draw_box(&mut canvas, rect);
        }
        canvas
    }

    pub fn save(&self, frame: &Frame) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        self.render(frame)
            .save(&self.path)
            .map_err(|source| Error::Image { path: self.path.clone(), source })?;
        debug!("Preview written to {}", self.path.display());
        Ok(())
    }
}

/// Clamps to the canvas and draws a `LINE_WIDTH` px outline growing inwards.
/// Boxes entirely outside the canvas are not drawn.
fn draw_box(canvas: &mut RgbImage, rect: &DisplayRect) {
    let (w, h) = canvas.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let clamp = |v: f64, max: u32| (v.round().max(0.0) as u32).min(max - 1);
    let x_min = clamp(rect.x1.min(rect.x2), w);
    let y_min = clamp(rect.y1.min(rect.y2), h);
    let x_max = clamp(rect.x1.max(rect.x2), w);
    let y_max = clamp(rect.y1.max(rect.y2), h);
    if rect.x1.max(rect.x2) < 0.0 || rect.y1.max(rect.y2) < 0.0 {
        return;
    }
    if rect.x1.min(rect.x2) >= w as f64 || rect.y1.min(rect.y2) >= h as f64 {
        return;
    }

    for t in 0..LINE_WIDTH {
        let rw = (x_max - x_min + 1).saturating_sub(2 * t);
        let rh = (y_max - y_min + 1).saturating_sub(2 * t);
        if rw == 0 || rh == 0 {
            break;
        }
        let outline = Rect::at((x_min + t) as i32, (y_min + t) as i32).of_size(rw, rh);
        draw_hollow_rect_mut(canvas, outline, BOX_COLOR);
    }
}
