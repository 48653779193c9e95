//! Interactive annotation batch
//!
//! Walks the image directory in natural order. For each image a fresh
//! session is opened and the event source is polled with a bounded timeout;
//! events go through the controller and the resulting effects are carried
//! out here. A successful save moves on to the next image, quit (or a closed
//! source, or an interrupt) ends the run.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

#[allow(unused_imports)]
use log::{debug, info, warn, error};

use crate::config::Config;
use crate::controller::{Effect, Flow, Frame, InteractionController, LabelRequest, Transition};
use crate::error::{Error, Result};
use crate::event_source::{EventSource, Polled};
use crate::file_io;
use crate::geometry::DisplayScale;
use crate::label_writer;
use crate::render::PreviewRenderer;
use crate::session::AnnotationSession;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotationReport {
    /// Label files written
    pub saved: usize,
    /// Images that could not be opened
    pub skipped_images: usize,
    /// The run stopped before the last image
    pub quit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageOutcome {
    Saved,
    Quit,
}

pub struct Annotator<'a> {
    config: &'a Config,
    controller: InteractionController,
    preview: Option<PathBuf>,
    cancel: &'a AtomicBool,
}

impl<'a> Annotator<'a> {
    pub fn new(config: &'a Config, preview: Option<PathBuf>, cancel: &'a AtomicBool) -> Self {
        Self {
            config,
            controller: InteractionController::new(config.annotate_class_id),
            preview,
            cancel,
        }
    }

    fn interrupted(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn run(&self, source: &mut dyn EventSource) -> Result<AnnotationReport> {
        let start = Instant::now();
        let images = file_io::get_image_paths(&self.config.image_dir)?;
        info!("Found {} image(s) in {}", images.len(), self.config.image_dir.display());

        let mut report = AnnotationReport::default();
        for (index, image_path) in images.iter().enumerate() {
            if self.interrupted() {
                info!("Interrupted; stopping.");
                report.quit = true;
                break;
            }

            info!("Image {}/{}: {}", index + 1, images.len(), image_path.display());
            let image = match image::open(image_path) {
                Ok(image) => image,
                Err(source) => {
                    let e = Error::Image { path: image_path.clone(), source };
                    warn!("Skipping: {}", e);
                    report.skipped_images += 1;
                    continue;
                }
            };

            match self.annotate_image(image_path, &image, source) {
                ImageOutcome::Saved => report.saved += 1,
                ImageOutcome::Quit => {
                    report.quit = true;
                    break;
                }
            }
        }

        info!(
            "Annotation finished in {:?}: {} saved, {} skipped{}",
            start.elapsed(),
            report.saved,
            report.skipped_images,
            if report.quit { ", stopped early" } else { "" }
        );
        Ok(report)
    }

    fn annotate_image(
        &self,
        image_path: &Path,
        image: &image::DynamicImage,
        source: &mut dyn EventSource,
    ) -> ImageOutcome {
        let scale = DisplayScale::for_image(
            image.width(),
            image.height(),
            self.config.max_display_width,
            self.config.max_display_height,
        );
        if scale.is_resized() {
            let (w, h) = scale.display_size();
            info!("Image resized to {}x{} (factor {:.4})", w, h, scale.factor());
        }

        let label_path = file_io::label_path_for(&self.config.label_dir, image_path);
        let renderer = self
            .preview
            .as_deref()
            .map(|path| PreviewRenderer::new(image, &scale, path));

        let mut session = AnnotationSession::new(self.config.edit_mode, self.config.rotated, scale);
        if let Some(renderer) = &renderer {
            redraw(renderer, &Frame::of(&session));
        }

        loop {
            if self.interrupted() {
                info!("Interrupted; stopping.");
                return ImageOutcome::Quit;
            }

            let event = match source.poll(self.config.poll_interval) {
                Polled::Event(event) => event,
                Polled::Idle => continue,
                Polled::Closed => {
                    info!("Input closed; stopping.");
                    return ImageOutcome::Quit;
                }
            };

            let Transition { session: next, flow, effects } = self.controller.handle(session, event);
            session = next;

            let mut saved = false;
            for effect in effects {
                match effect {
                    Effect::Redraw(frame) => {
                        if let Some(renderer) = &renderer {
                            redraw(renderer, &frame);
                        }
                    }
                    Effect::WriteLabels(request) => {
                        saved = save_labels(&label_path, &request);
                    }
                }
            }

            match flow {
                Flow::Continue => {}
                Flow::NextImage if saved => return ImageOutcome::Saved,
                // The write failed; keep editing this image
                Flow::NextImage => {}
                Flow::Quit => {
                    info!("Quit requested.");
                    return ImageOutcome::Quit;
                }
            }
        }
    }
}

fn redraw(renderer: &PreviewRenderer, frame: &Frame) {
    if let Err(e) = renderer.save(frame) {
        warn!("Failed to update preview: {}", e);
    }
}

fn save_labels(label_path: &Path, request: &LabelRequest) -> bool {
    match label_writer::write(label_path, request) {
        Ok(count) => {
            info!("Saved YOLO labels: {} ({} box(es))", label_path.display(), count);
            true
        }
        Err(e) => {
            error!("Failed to save labels to {}: {}", label_path.display(), e);
            false
        }
    }
}
