use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::event_source::KeyBindings;
use crate::session::EditMode;
use crate::settings::UserSettings;

// Default values for configuration
// These serve as fallback values for missing settings keys
pub const DEFAULT_IMAGE_DIR: &str = "images";
pub const DEFAULT_LABEL_DIR: &str = "labels";
pub const DEFAULT_XML_DIR: &str = "images";
pub const DEFAULT_MAX_DISPLAY_WIDTH: u32 = 800;
pub const DEFAULT_MAX_DISPLAY_HEIGHT: u32 = 800;
pub const DEFAULT_ANNOTATE_CLASS: &str = "l";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Class name -> class id, fixed once configuration is done
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassMap(BTreeMap<String, u32>);

impl ClassMap {
    pub fn new(classes: BTreeMap<String, u32>) -> Self {
        Self(classes)
    }

    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<const N: usize> From<[(&str, u32); N]> for ClassMap {
    fn from(entries: [(&str, u32); N]) -> Self {
        Self(entries.iter().map(|(name, id)| (name.to_string(), *id)).collect())
    }
}

/// Validated, read-only configuration for one run
#[derive(Debug, Clone)]
pub struct Config {
    pub image_dir: PathBuf,
    pub label_dir: PathBuf,
    pub xml_dir: PathBuf,
    pub max_display_width: u32,
    pub max_display_height: u32,
    pub classes: ClassMap,
    pub annotate_class_id: u32,
    pub edit_mode: EditMode,
    pub rotated: bool,
    pub poll_interval: Duration,
    pub keys: KeyBindings,
}

impl Config {
    pub fn from_settings(settings: &UserSettings) -> Result<Self> {
        if settings.max_display_width == 0 || settings.max_display_height == 0 {
            return Err(Error::Config(format!(
                "max display size must be positive, got {}x{}",
                settings.max_display_width, settings.max_display_height
            )));
        }

        if settings.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be positive".to_string()));
        }

        let classes = ClassMap::new(settings.classes.clone());
        let annotate_class_id = classes.id_of(&settings.annotate_class).ok_or_else(|| {
            Error::Config(format!(
                "annotate_class {:?} is not in the class map",
                settings.annotate_class
            ))
        })?;

        settings.keys.validate()?;

        Ok(Self {
            image_dir: PathBuf::from(&settings.image_dir),
            label_dir: PathBuf::from(&settings.label_dir),
            xml_dir: PathBuf::from(&settings.xml_dir),
            max_display_width: settings.max_display_width,
            max_display_height: settings.max_display_height,
            classes,
            annotate_class_id,
            edit_mode: settings.edit_mode,
            rotated: settings.rotated,
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
            keys: settings.keys.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::from_settings(&UserSettings::default()).unwrap();
        assert_eq!(config.annotate_class_id, 0);
        assert_eq!(config.classes.id_of("l"), Some(0));
        assert_eq!(config.edit_mode, EditMode::Draggable);
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.image_dir, PathBuf::from("images"));
    }

    #[test]
    fn test_annotate_class_uses_the_map() {
        let mut settings = UserSettings::default();
        settings.classes.insert("car".to_string(), 4);
        settings.annotate_class = "car".to_string();
        assert_eq!(Config::from_settings(&settings).unwrap().annotate_class_id, 4);

        settings.annotate_class = "bus".to_string();
        assert!(matches!(Config::from_settings(&settings), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_zero_limits() {
        let mut settings = UserSettings::default();
        settings.max_display_height = 0;
        assert!(Config::from_settings(&settings).is_err());

        let mut settings = UserSettings::default();
        settings.poll_interval_ms = 0;
        assert!(Config::from_settings(&settings).is_err());
    }

    #[test]
    fn test_class_map_lookup() {
        let classes = ClassMap::from([("l", 0), ("car", 2)]);
        assert_eq!(classes.id_of("car"), Some(2));
        assert_eq!(classes.id_of("bus"), None);
        assert_eq!(classes.len(), 2);
    }
}
