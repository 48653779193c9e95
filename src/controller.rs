//! Maps input events onto session transitions
//!
//! `InteractionController::handle` is a pure step function: it takes the
//! session by value, returns it with the flow decision and the effects to
//! perform. Redraws and label writes are described here and carried out by
//! the annotation runner, so the whole editing loop can be driven without a
//! display.

#[allow(unused_imports)]
use log::{debug, info};

use crate::geometry::{DisplayRect, DisplaySpace, PixelRect, Point};
use crate::session::AnnotationSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Press,
    Move,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Save,
    Reset,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Left-button activity, observed in display space
    Pointer {
        kind: PointerKind,
        position: Point<DisplaySpace>,
    },
    Command(Command),
}

impl InputEvent {
    pub fn press(x: f64, y: f64) -> Self {
        InputEvent::Pointer { kind: PointerKind::Press, position: Point::new(x, y) }
    }

    pub fn moved(x: f64, y: f64) -> Self {
        InputEvent::Pointer { kind: PointerKind::Move, position: Point::new(x, y) }
    }

    pub fn release(x: f64, y: f64) -> Self {
        InputEvent::Pointer { kind: PointerKind::Release, position: Point::new(x, y) }
    }
}

/// What should be on screen: committed boxes plus the rectangle being drawn
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub boxes: Vec<DisplayRect>,
    pub live: Option<DisplayRect>,
}

impl Frame {
    pub fn of(session: &AnnotationSession) -> Self {
        let scale = session.scale();
        Self {
            boxes: session.boxes().iter().map(|rect| scale.to_display(rect)).collect(),
            live: session.live_rect().map(|rect| scale.to_display(&rect)),
        }
    }
}

/// Everything the label writer needs, in original pixel space
#[derive(Debug, Clone, PartialEq)]
pub struct LabelRequest {
    pub boxes: Vec<PixelRect>,
    pub image_size: (u32, u32),
    pub class_id: u32,
    pub rotated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Redraw(Frame),
    WriteLabels(LabelRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep editing the current image
    Continue,
    /// The image is done (saved); move on to the next one
    NextImage,
    /// Stop the whole run without writing anything
    Quit,
}

#[derive(Debug)]
pub struct Transition {
    pub session: AnnotationSession,
    pub flow: Flow,
    pub effects: Vec<Effect>,
}

pub struct InteractionController {
    class_id: u32,
}

impl InteractionController {
    /// `class_id` labels every interactively drawn box
    pub fn new(class_id: u32) -> Self {
        Self { class_id }
    }

    pub fn handle(&self, mut session: AnnotationSession, event: InputEvent) -> Transition {
        match event {
            InputEvent::Pointer { kind, position } => {
                // The only crossing from display space into original space
                let p = session.scale().to_original(position);
                let changed = match kind {
                    PointerKind::Press => {
                        session.press(p);
                        true
                    }
                    PointerKind::Move => session.move_to(p),
                    PointerKind::Release => session.release(p).is_some(),
                };
                let effects = if changed {
                    vec![Effect::Redraw(Frame::of(&session))]
                } else {
                    Vec::new()
                };
                Transition { session, flow: Flow::Continue, effects }
            }
            InputEvent::Command(Command::Save) => {
                let request = LabelRequest {
                    boxes: session.boxes().to_vec(),
                    image_size: session.image_size(),
                    class_id: self.class_id,
                    rotated: session.is_rotated(),
                };
                debug!("Save requested with {} box(es)", request.boxes.len());
                Transition {
                    session,
                    flow: Flow::NextImage,
                    effects: vec![Effect::WriteLabels(request)],
                }
            }
            InputEvent::Command(Command::Reset) => {
                session.reset();
                info!("Reset boxes.");
                let frame = Frame::of(&session);
                Transition { session, flow: Flow::Continue, effects: vec![Effect::Redraw(frame)] }
            }
            InputEvent::Command(Command::Quit) => {
                Transition { session, flow: Flow::Quit, effects: Vec::new() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::DisplayScale;
    use crate::session::EditMode;

    fn run(
        controller: &InteractionController,
        mut session: AnnotationSession,
        events: &[InputEvent],
    ) -> (AnnotationSession, Vec<Transition>) {
        let mut seen = Vec::new();
        for event in events {
            let transition = controller.handle(session, *event);
            session = transition.session.clone();
            seen.push(transition);
        }
        (session, seen)
    }

    #[test]
    fn test_pointer_positions_are_mapped_to_original_pixels() {
        let controller = InteractionController::new(0);
        let session = AnnotationSession::new(
            EditMode::Multi,
            false,
            DisplayScale::for_image(2000, 1000, 800, 800),
        );
        let (session, _) = run(
            &controller,
            session,
            &[InputEvent::press(40.0, 40.0), InputEvent::moved(120.0, 160.0), InputEvent::release(120.0, 160.0)],
        );
        assert_eq!(session.boxes(), &[PixelRect::new(100.0, 100.0, 300.0, 400.0)]);

        let transition = controller.handle(session, InputEvent::Command(Command::Save));
        assert_eq!(transition.flow, Flow::NextImage);
        match &transition.effects[..] {
            [Effect::WriteLabels(request)] => {
                assert_eq!(request.image_size, (2000, 1000));
                assert_eq!(request.boxes, vec![PixelRect::new(100.0, 100.0, 300.0, 400.0)]);
                assert_eq!(request.class_id, 0);
            }
            other => panic!("unexpected effects {:?}", other),
        }
    }

    #[test]
    fn test_redraw_frame_is_in_display_space() {
        let controller = InteractionController::new(0);
        let session = AnnotationSession::new(
            EditMode::Multi,
            false,
            DisplayScale::for_image(1600, 800, 800, 800),
        );
        let (_, transitions) = run(&controller, session, &[InputEvent::press(10.0, 10.0), InputEvent::moved(30.0, 20.0)]);
        match &transitions[1].effects[..] {
            [Effect::Redraw(frame)] => {
                let live = frame.live.unwrap();
                assert_eq!((live.x1, live.y1, live.x2, live.y2), (10.0, 10.0, 30.0, 20.0));
                assert!(frame.boxes.is_empty());
            }
            other => panic!("unexpected effects {:?}", other),
        }
    }

    #[test]
    fn test_idle_move_requests_no_redraw() {
        let controller = InteractionController::new(0);
        let session = AnnotationSession::new(EditMode::Multi, false, DisplayScale::identity(100, 100));
        let transition = controller.handle(session, InputEvent::moved(5.0, 5.0));
        assert!(transition.effects.is_empty());
        assert_eq!(transition.flow, Flow::Continue);
    }

    #[test]
    fn test_reset_then_save_requests_empty_file() {
        let controller = InteractionController::new(3);
        let session = AnnotationSession::new(EditMode::Multi, false, DisplayScale::identity(100, 100));
        let (session, _) = run(
            &controller,
            session,
            &[
                InputEvent::press(1.0, 1.0),
                InputEvent::release(10.0, 10.0),
                InputEvent::press(20.0, 20.0),
                InputEvent::release(30.0, 30.0),
            ],
        );
        assert_eq!(session.boxes().len(), 2);

        let reset = controller.handle(session, InputEvent::Command(Command::Reset));
        assert_eq!(reset.flow, Flow::Continue);
        assert!(reset.session.boxes().is_empty());
        assert_eq!(reset.effects, vec![Effect::Redraw(Frame { boxes: vec![], live: None })]);

        let save = controller.handle(reset.session, InputEvent::Command(Command::Save));
        match &save.effects[..] {
            [Effect::WriteLabels(request)] => assert!(request.boxes.is_empty()),
            other => panic!("unexpected effects {:?}", other),
        }
    }

    #[test]
    fn test_save_ignores_gesture_in_progress() {
        let controller = InteractionController::new(0);
        let session = AnnotationSession::new(EditMode::Multi, false, DisplayScale::identity(100, 100));
        let (session, _) = run(&controller, session, &[InputEvent::press(1.0, 1.0), InputEvent::moved(50.0, 50.0)]);
        let save = controller.handle(session, InputEvent::Command(Command::Save));
        match &save.effects[..] {
            [Effect::WriteLabels(request)] => assert!(request.boxes.is_empty()),
            other => panic!("unexpected effects {:?}", other),
        }
    }

    #[test]
    fn test_quit_writes_nothing() {
        let controller = InteractionController::new(0);
        let session = AnnotationSession::new(EditMode::Single, false, DisplayScale::identity(100, 100));
        let (session, _) = run(&controller, session, &[InputEvent::press(1.0, 1.0), InputEvent::release(9.0, 9.0)]);
        let quit = controller.handle(session, InputEvent::Command(Command::Quit));
        assert_eq!(quit.flow, Flow::Quit);
        assert!(quit.effects.is_empty());
    }
}
