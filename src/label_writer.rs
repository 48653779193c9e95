//! Label file serialization
//!
//! One line per box: `class_id x_center y_center width height [angle]`, each
//! float with six decimals, every line terminated by `\n`. No boxes means a
//! zero-byte file. Files are replaced atomically: the new content goes to a
//! temporary file next to the target which is then renamed over it, so a
//! failed write leaves the previous labels intact.

use std::fs;
use std::io::Write;
use std::path::Path;

#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::codec::{to_normalized, to_normalized_rotated, NormalizedLabel};
use crate::controller::LabelRequest;
use crate::error::Result;

pub fn format_label(label: &NormalizedLabel) -> String {
    let mut line = format!(
        "{} {:.6} {:.6} {:.6} {:.6}",
        label.class_id, label.x_center, label.y_center, label.width, label.height
    );
    if let Some(angle) = label.angle {
        line.push_str(&format!(" {:.6}", angle));
    }
    line
}

pub fn format_labels(labels: &[NormalizedLabel]) -> String {
    labels
        .iter()
        .map(|label| format_label(label) + "\n")
        .collect()
}

/// Converts the request's boxes with the codec
pub fn labels_for_request(request: &LabelRequest) -> Vec<NormalizedLabel> {
    request
        .boxes
        .iter()
        .map(|rect| {
            if request.rotated {
                to_normalized_rotated(rect, request.class_id, request.image_size)
            } else {
                to_normalized(rect, request.class_id, request.image_size)
            }
        })
        .collect()
}

/// Replaces `path` with the given labels, creating its directory if needed
pub fn write_label_file(path: &Path, labels: &[NormalizedLabel]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(format_labels(labels).as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    debug!("Wrote {} label(s) to {}", labels.len(), path.display());
    Ok(())
}

/// Writes an interactive save request; returns the number of lines written
pub fn write(path: &Path, request: &LabelRequest) -> Result<usize> {
    let labels = labels_for_request(request);
    write_label_file(path, &labels)?;
    Ok(labels.len())
}
