use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use log::{debug, info, warn, error};

use crate::config::{
    DEFAULT_ANNOTATE_CLASS, DEFAULT_IMAGE_DIR, DEFAULT_LABEL_DIR, DEFAULT_MAX_DISPLAY_HEIGHT,
    DEFAULT_MAX_DISPLAY_WIDTH, DEFAULT_POLL_INTERVAL_MS, DEFAULT_XML_DIR,
};
use crate::error::{Error, Result};
use crate::event_source::KeyBindings;
use crate::session::EditMode;

/// User settings persisted as YAML; every field falls back to its default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    /// Directory scanned for images to annotate
    #[serde(default = "default_image_dir")]
    pub image_dir: String,

    /// Directory receiving the label files
    #[serde(default = "default_label_dir")]
    pub label_dir: String,

    /// Directory scanned for XML records by `convert`
    #[serde(default = "default_xml_dir")]
    pub xml_dir: String,

    /// Images wider than this are shown downscaled
    #[serde(default = "default_max_display_width")]
    pub max_display_width: u32,

    /// Images taller than this are shown downscaled
    #[serde(default = "default_max_display_height")]
    pub max_display_height: u32,

    /// Class name -> class id
    #[serde(default = "default_classes")]
    pub classes: BTreeMap<String, u32>,

    /// Class assigned to every interactively drawn box
    #[serde(default = "default_annotate_class")]
    pub annotate_class: String,

    /// "multi", "single" or "draggable"
    #[serde(default)]
    pub edit_mode: EditMode,

    /// Record the drag angle with each box
    #[serde(default)]
    pub rotated: bool,

    /// Upper bound on a single wait for input
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default)]
    pub keys: KeyBindings,
}

fn default_image_dir() -> String {
    DEFAULT_IMAGE_DIR.to_string()
}

fn default_label_dir() -> String {
    DEFAULT_LABEL_DIR.to_string()
}

fn default_xml_dir() -> String {
    DEFAULT_XML_DIR.to_string()
}

fn default_max_display_width() -> u32 {
    DEFAULT_MAX_DISPLAY_WIDTH
}

fn default_max_display_height() -> u32 {
    DEFAULT_MAX_DISPLAY_HEIGHT
}

fn default_classes() -> BTreeMap<String, u32> {
    BTreeMap::from([(DEFAULT_ANNOTATE_CLASS.to_string(), 0)])
}

fn default_annotate_class() -> String {
    DEFAULT_ANNOTATE_CLASS.to_string()
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            image_dir: default_image_dir(),
            label_dir: default_label_dir(),
            xml_dir: default_xml_dir(),
            max_display_width: default_max_display_width(),
            max_display_height: default_max_display_height(),
            classes: default_classes(),
            annotate_class: default_annotate_class(),
            edit_mode: EditMode::default(),
            rotated: false,
            poll_interval_ms: default_poll_interval_ms(),
            keys: KeyBindings::default(),
        }
    }
}

impl UserSettings {
    /// Get the path to the settings file
    /// On macOS: ~/Library/Application Support/boxskater/settings.yaml
    /// On Linux: ~/.config/boxskater/settings.yaml
    /// On Windows: C:\Users\<user>\AppData\Roaming\boxskater\settings.yaml
    pub fn settings_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."));

        config_dir.join("boxskater").join("settings.yaml")
    }

    /// Load settings from the YAML file
    /// If custom_path is provided, uses that path; otherwise uses the default settings path
    pub fn load(custom_path: Option<&Path>) -> Self {
        let path = match custom_path {
            Some(p) => {
                info!("Using custom settings path: {}", p.display());
                p.to_path_buf()
            }
            None => Self::settings_path(),
        };

        if !path.exists() {
            info!("Settings file not found at {:?}, using defaults", path);
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_yaml(&contents) {
                Ok(settings) => {
                    info!("Loaded settings from {:?}", path);
                    debug!("Settings: {:?}", settings);
                    settings
                }
                Err(e) => {
                    error!("Failed to parse settings file at {:?}: {}", path, e);
                    warn!("Using default settings");
                    Self::default()
                }
            },
            Err(e) => {
                error!("Failed to read settings file at {:?}: {}", path, e);
                warn!("Using default settings");
                Self::default()
            }
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to an all-default map
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents).map_err(|e| Error::Settings(e.to_string()))
    }

    /// Write a commented settings file; an existing file is never overwritten
    pub fn write_new(&self, path: &Path) -> Result<()> {
        if path.exists() {
            return Err(Error::Settings(format!(
                "{} already exists, not overwriting",
                path.display()
            )));
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        fs::write(path, self.to_yaml_with_comments())?;
        info!("Wrote settings to {:?}", path);
        Ok(())
    }

    /// Generate YAML content with comments for new files
    pub fn to_yaml_with_comments(&self) -> String {
        let mut classes = String::new();
        for (name, id) in &self.classes {
            classes.push_str(&format!("  {:?}: {}\n", name, id));
        }
        if classes.is_empty() {
            classes.push_str("  {}\n");
        }

        format!(
r#"# boxskater settings
# Every key is optional; missing keys use the built-in defaults.

# Directory scanned for .jpg/.jpeg/.png images by `boxskater annotate`
image_dir: {:?}

# Directory receiving one <image stem>.txt label file per saved image
label_dir: {:?}

# Directory scanned for .xml annotation records by `boxskater convert`
xml_dir: {:?}

# Images larger than this are shown downscaled; labels always use original pixels
max_display_width: {}
max_display_height: {}

# Class name -> class id, used by both annotate and convert
classes:
{}
# Class given to every box drawn in annotate
annotate_class: {:?}

# "multi": every box is kept, "single": a new box replaces the old one,
# "draggable": single box that can be moved by dragging from inside it
edit_mode: "{}"

# Append the drag angle (degrees) to every label line
rotated: {}

# Longest single wait for input, in milliseconds
poll_interval_ms: {}

# Single-token commands typed while annotating
keys:
  save: {:?}
  reset: {:?}
  quit: {:?}
"#,
            self.image_dir,
            self.label_dir,
            self.xml_dir,
            self.max_display_width,
            self.max_display_height,
            classes,
            self.annotate_class,
            self.edit_mode,
            self.rotated,
            self.poll_interval_ms,
            self.keys.save,
            self.keys.reset,
            self.keys.quit,
        )
    }
}
