//! Editing state for one image
//!
//! A session owns the committed boxes, the gesture in progress and the display
//! scale of its image. Everything here is in original pixel space; pointer
//! positions are converted by the controller before they reach the session.

use std::fmt;
use serde::{Deserialize, Serialize};

#[allow(unused_imports)]
use log::{debug, info, trace};

use crate::geometry::{DisplayScale, OriginalSpace, PixelRect, Point};

/// How completed drawings and presses on an existing box are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    /// Every completed drawing is appended
    Multi,
    /// A completed drawing replaces the sole box
    Single,
    /// Single box that moves when a press lands inside it
    #[default]
    Draggable,
}

impl fmt::Display for EditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditMode::Multi => write!(f, "multi"),
            EditMode::Single => write!(f, "single"),
            EditMode::Draggable => write!(f, "draggable"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Idle,
    /// Button held after a press outside any box; the live rectangle spans
    /// `anchor` to `current`
    Drawing {
        anchor: Point<OriginalSpace>,
        current: Point<OriginalSpace>,
        angle: f64,
    },
    /// Button held after a press inside the box; `grab` is the press position
    /// relative to the box's upper-left corner
    Dragging { grab_dx: f64, grab_dy: f64 },
}

/// Direction of the drag vector from `anchor` to `current`, in degrees
pub fn drag_angle(anchor: Point<OriginalSpace>, current: Point<OriginalSpace>) -> f64 {
    (current.y - anchor.y).atan2(current.x - anchor.x).to_degrees()
}

#[derive(Debug, Clone)]
pub struct AnnotationSession {
    mode: EditMode,
    rotated: bool,
    scale: DisplayScale,
    boxes: Vec<PixelRect>,
    gesture: Gesture,
}

impl AnnotationSession {
    pub fn new(mode: EditMode, rotated: bool, scale: DisplayScale) -> Self {
        Self {
            mode,
            rotated,
            scale,
            boxes: Vec::new(),
            gesture: Gesture::Idle,
        }
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn is_rotated(&self) -> bool {
        self.rotated
    }

    pub fn scale(&self) -> &DisplayScale {
        &self.scale
    }

    pub fn image_size(&self) -> (u32, u32) {
        self.scale.original_size()
    }

    /// Committed boxes; at most one outside of `EditMode::Multi`
    pub fn boxes(&self) -> &[PixelRect] {
        &self.boxes
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.gesture, Gesture::Idle)
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.gesture, Gesture::Drawing { .. })
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.gesture, Gesture::Dragging { .. })
    }

    /// The rectangle being drawn, if any
    pub fn live_rect(&self) -> Option<PixelRect> {
        match self.gesture {
            Gesture::Drawing { anchor, current, angle } => Some(self.drawn_rect(anchor, current, angle)),
            _ => None,
        }
    }

    fn drawn_rect(&self, anchor: Point<OriginalSpace>, current: Point<OriginalSpace>, angle: f64) -> PixelRect {
        let rect = PixelRect::from_corners(anchor, current);
        if self.rotated {
            rect.with_angle(Some(angle))
        } else {
            rect
        }
    }

    /// The box a press would grab, if dragging applies in this mode
    fn grabbable_box(&self, p: Point<OriginalSpace>) -> Option<&PixelRect> {
        if self.mode != EditMode::Draggable {
            return None;
        }
        self.boxes.first().filter(|rect| rect.contains_strictly(p))
    }

    /// Button pressed: starts dragging when the press lands strictly inside
    /// the box in draggable mode, drawing otherwise
    pub fn press(&mut self, p: Point<OriginalSpace>) {
        if !self.is_idle() {
            // The matching release was lost; the unfinished gesture is dropped
            debug!("Press while {:?}, abandoning gesture", self.gesture);
            self.gesture = Gesture::Idle;
        }

        if let Some(rect) = self.grabbable_box(p).copied() {
            self.gesture = Gesture::Dragging {
                grab_dx: p.x - rect.x1,
                grab_dy: p.y - rect.y1,
            };
            debug!("Dragging box {} from {}", rect, p);
        } else {
            self.gesture = Gesture::Drawing { anchor: p, current: p, angle: 0.0 };
            trace!("Drawing from {}", p);
        }
    }

    /// Pointer moved; returns true when something visible changed
    pub fn move_to(&mut self, p: Point<OriginalSpace>) -> bool {
        match self.gesture {
            Gesture::Idle => false,
            Gesture::Drawing { anchor, .. } => {
                self.gesture = Gesture::Drawing { anchor, current: p, angle: drag_angle(anchor, p) };
                true
            }
            Gesture::Dragging { grab_dx, grab_dy } => {
                if let Some(rect) = self.boxes.first_mut() {
                    *rect = rect.moved_to(p.x - grab_dx, p.y - grab_dy);
                }
                true
            }
        }
    }

    /// Button released: commits a drawing or ends a drag. Returns the box
    /// that was committed or moved, `None` if no gesture was in progress.
    pub fn release(&mut self, p: Point<OriginalSpace>) -> Option<PixelRect> {
        let released = match self.gesture {
            Gesture::Idle => None,
            Gesture::Drawing { anchor, .. } => {
                let rect = self.drawn_rect(anchor, p, drag_angle(anchor, p));
                match self.mode {
                    EditMode::Multi => self.boxes.push(rect),
                    EditMode::Single | EditMode::Draggable => self.boxes = vec![rect],
                }
                debug!("Box: {}", rect);
                Some(rect)
            }
            Gesture::Dragging { .. } => {
                self.move_to(p);
                self.boxes.first().copied()
            }
        };
        self.gesture = Gesture::Idle;
        released
    }

    /// Drops every box and any gesture in progress
    pub fn reset(&mut self) {
        self.boxes.clear();
        self.gesture = Gesture::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(mode: EditMode) -> AnnotationSession {
        AnnotationSession::new(mode, false, DisplayScale::identity(1000, 500))
    }

    fn pt(x: f64, y: f64) -> Point<OriginalSpace> {
        Point::new(x, y)
    }

    fn draw(s: &mut AnnotationSession, from: (f64, f64), to: (f64, f64)) {
        s.press(pt(from.0, from.1));
        s.move_to(pt(to.0, to.1));
        s.release(pt(to.0, to.1));
    }

    #[test]
    fn test_draw_commits_ordered_box() {
        let mut s = session(EditMode::Multi);
        s.press(pt(300.0, 400.0));
        assert!(s.is_drawing());
        assert!(s.move_to(pt(200.0, 250.0)));
        let live = s.live_rect().unwrap();
        assert_eq!((live.x1, live.y1, live.x2, live.y2), (200.0, 250.0, 300.0, 400.0));

        let committed = s.release(pt(100.0, 100.0)).unwrap();
        assert_eq!((committed.x1, committed.y1, committed.x2, committed.y2), (100.0, 100.0, 300.0, 400.0));
        assert!(s.is_idle());
        assert_eq!(s.boxes(), &[committed]);
        assert_eq!(committed.angle, None);
    }

    #[test]
    fn test_multi_mode_is_additive() {
        let mut s = session(EditMode::Multi);
        draw(&mut s, (10.0, 10.0), (50.0, 50.0));
        // A press inside an existing box still draws in multi mode
        draw(&mut s, (20.0, 20.0), (40.0, 45.0));
        assert_eq!(s.boxes().len(), 2);
    }

    #[test]
    fn test_single_mode_replaces() {
        let mut s = session(EditMode::Single);
        draw(&mut s, (10.0, 10.0), (50.0, 50.0));
        s.press(pt(20.0, 20.0));
        assert!(s.is_drawing());
        s.release(pt(60.0, 70.0));
        assert_eq!(s.boxes(), &[PixelRect::new(20.0, 20.0, 60.0, 70.0)]);
    }

    #[test]
    fn test_press_inside_box_drags_instead_of_drawing() {
        let mut s = session(EditMode::Draggable);
        draw(&mut s, (100.0, 100.0), (200.0, 150.0));

        s.press(pt(120.0, 110.0));
        assert!(s.is_dragging());
        assert!(!s.is_drawing());
        assert!(s.live_rect().is_none());

        s.move_to(pt(320.0, 210.0));
        assert_eq!(s.boxes(), &[PixelRect::new(300.0, 200.0, 400.0, 250.0)]);

        s.release(pt(320.0, 210.0));
        assert!(s.is_idle());
        assert_eq!(s.boxes(), &[PixelRect::new(300.0, 200.0, 400.0, 250.0)]);
    }

    #[test]
    fn test_press_outside_or_on_edge_draws() {
        let mut s = session(EditMode::Draggable);
        draw(&mut s, (100.0, 100.0), (200.0, 150.0));

        s.press(pt(250.0, 120.0));
        assert!(s.is_drawing());
        assert!(!s.is_dragging());
        s.release(pt(260.0, 130.0));
        assert_eq!(s.boxes(), &[PixelRect::new(250.0, 120.0, 260.0, 130.0)]);

        // The edge of the box is not inside it
        s.press(pt(250.0, 125.0));
        assert!(s.is_drawing());
    }

    #[test]
    fn test_press_with_no_box_draws() {
        let mut s = session(EditMode::Draggable);
        s.press(pt(5.0, 5.0));
        assert!(s.is_drawing());
    }

    #[test]
    fn test_click_without_drag_yields_degenerate_box() {
        let mut s = session(EditMode::Multi);
        s.press(pt(42.0, 24.0));
        let rect = s.release(pt(42.0, 24.0)).unwrap();
        assert_eq!(rect.width(), 0.0);
        assert_eq!(rect.height(), 0.0);
        assert_eq!(s.boxes().len(), 1);
    }

    #[test]
    fn test_reset_discards_boxes_and_gesture() {
        let mut s = session(EditMode::Multi);
        draw(&mut s, (10.0, 10.0), (50.0, 50.0));
        draw(&mut s, (60.0, 60.0), (90.0, 90.0));
        s.press(pt(1.0, 1.0));
        s.reset();
        assert!(s.boxes().is_empty());
        assert!(s.is_idle());
    }

    #[test]
    fn test_moves_and_releases_while_idle_do_nothing() {
        let mut s = session(EditMode::Draggable);
        assert!(!s.move_to(pt(10.0, 10.0)));
        assert!(s.release(pt(10.0, 10.0)).is_none());
        assert!(s.boxes().is_empty());
    }

    #[test]
    fn test_rotated_angle_follows_final_drag_vector() {
        let mut s = AnnotationSession::new(EditMode::Multi, true, DisplayScale::identity(100, 100));
        s.press(pt(50.0, 50.0));
        s.move_to(pt(60.0, 50.0));
        assert_eq!(s.live_rect().unwrap().angle, Some(0.0));
        s.move_to(pt(50.0, 60.0));
        assert_eq!(s.live_rect().unwrap().angle, Some(90.0));

        let rect = s.release(pt(40.0, 40.0)).unwrap();
        assert!((rect.angle.unwrap() - -135.0).abs() < 1e-9);
        assert_eq!((rect.x1, rect.y1, rect.x2, rect.y2), (40.0, 40.0, 50.0, 50.0));
    }

    #[test]
    fn test_drag_keeps_angle() {
        let mut s = AnnotationSession::new(EditMode::Draggable, true, DisplayScale::identity(100, 100));
        draw(&mut s, (10.0, 10.0), (30.0, 20.0));
        let angle = s.boxes()[0].angle;
        s.press(pt(15.0, 15.0));
        s.release(pt(25.0, 25.0));
        assert_eq!(s.boxes()[0].angle, angle);
        assert_eq!((s.boxes()[0].x1, s.boxes()[0].y1), (20.0, 20.0));
    }

    #[test]
    fn test_edit_mode_names() {
        assert_eq!(EditMode::Draggable.to_string(), "draggable");
        assert_eq!(serde_yaml::from_str::<EditMode>("multi").unwrap(), EditMode::Multi);
    }
}
