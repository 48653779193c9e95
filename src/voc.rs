//! Pascal VOC style XML annotation records
//!
//! A record holds the image size and a list of named objects with absolute
//! pixel boxes (upper-left / lower-right). Only the elements needed for
//! label conversion are read; everything else in the document is ignored,
//! including elements interleaved between `<object>`s.
//!
//! Size and object names are checked when the record is parsed. Box
//! coordinates are checked only for objects whose class is mapped, so an
//! unmapped object never fails its record.

use std::path::Path;
use serde::Deserialize;

#[allow(unused_imports)]
use log::{debug, warn};

use crate::config::ClassMap;
use crate::error::{Error, Result};
use crate::geometry::PixelRect;

#[derive(Debug, Deserialize)]
struct RawRecord {
    size: Option<RawSize>,
    #[serde(rename = "object", default)]
    objects: Vec<RawObject>,
}

#[derive(Debug, Deserialize)]
struct RawSize {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawObject {
    name: Option<String>,
    bndbox: Option<RawBndBox>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct RawBndBox {
    xmin: Option<String>,
    ymin: Option<String>,
    xmax: Option<String>,
    ymax: Option<String>,
}

/// One named object of a record
#[derive(Debug, Clone, PartialEq)]
pub struct SourceObject {
    pub class_name: String,
    bndbox: Option<RawBndBox>,
}

/// A parsed record: image size plus objects in document order
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub image_size: (u32, u32),
    pub objects: Vec<SourceObject>,
}

/// Objects whose class is in the map, with their resolved ids
#[derive(Debug, Clone, PartialEq)]
pub struct MappedObjects {
    pub boxes: Vec<(u32, PixelRect)>,
    pub skipped: usize,
}

fn required<T>(value: Option<T>, what: &str) -> Result<T> {
    value.ok_or_else(|| Error::Parse(format!("missing <{}>", what)))
}

fn coordinate(value: Option<&String>, what: &str) -> Result<f64> {
    let text = required(value, what)?.trim();
    text.parse()
        .map_err(|_| Error::Parse(format!("<{}> is not a number: {:?}", what, text)))
}

impl SourceObject {
    /// The object's box; fails if `<bndbox>` or one of its corners is
    /// missing or not a number
    pub fn rect(&self) -> Result<PixelRect> {
        let bndbox = required(self.bndbox.as_ref(), "object/bndbox")?;
        // Coordinates are taken as given; xmin <= xmax is not checked
        Ok(PixelRect::new(
            coordinate(bndbox.xmin.as_ref(), "bndbox/xmin")?,
            coordinate(bndbox.ymin.as_ref(), "bndbox/ymin")?,
            coordinate(bndbox.xmax.as_ref(), "bndbox/xmax")?,
            coordinate(bndbox.ymax.as_ref(), "bndbox/ymax")?,
        ))
    }
}

impl SourceRecord {
    pub fn from_str(xml: &str) -> Result<Self> {
        let raw: RawRecord = quick_xml::de::from_str(xml)?;

        let size = required(raw.size, "size")?;
        let width = required(size.width, "size/width")?;
        let height = required(size.height, "size/height")?;
        if width == 0 || height == 0 {
            return Err(Error::Parse(format!("image size {}x{} is empty", width, height)));
        }

        let objects = raw
            .objects
            .into_iter()
            .enumerate()
            .map(|(index, obj)| {
                let class_name = obj
                    .name
                    .map(|name| name.trim().to_string())
                    .ok_or_else(|| Error::Parse(format!("object {} has no <name>", index)))?;
                Ok(SourceObject { class_name, bndbox: obj.bndbox })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { image_size: (width, height), objects })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Resolves class names to ids. Unknown classes are skipped one object
    /// at a time; the rest of the record is kept. A mapped object without a
    /// complete box fails the record.
    pub fn map_classes(&self, classes: &ClassMap) -> Result<MappedObjects> {
        let mut boxes = Vec::with_capacity(self.objects.len());
        let mut skipped = 0;
        for obj in &self.objects {
            match classes.id_of(&obj.class_name) {
                Some(id) => boxes.push((id, obj.rect()?)),
                None => {
                    warn!("Class '{}' not found in mapping. Skipping.", obj.class_name);
                    skipped += 1;
                }
            }
        }
        Ok(MappedObjects { boxes, skipped })
    }
}
