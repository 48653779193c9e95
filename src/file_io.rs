use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

#[allow(unused_imports)]
use log::{debug, info, warn, error};

use crate::error::Result;

pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
pub const XML_EXTENSIONS: [&str; 1] = ["xml"];

pub fn get_filename(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(OsStr::to_str)
        .map(|s| s.to_string())
}

pub fn has_extension(path: &Path, allowed_extensions: &[&str]) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| allowed_extensions.iter().any(|allowed| ext.eq_ignore_ascii_case(allowed)))
        .unwrap_or(false)
}

/// Regular files in `directory_path` with one of the extensions, in natural
/// order. A missing or unreadable directory is an error.
pub fn get_paths_with_extensions(directory_path: &Path, allowed_extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(directory_path)? {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", directory_path.display(), e);
                continue;
            }
        };
        if path.is_file() && has_extension(&path, allowed_extensions) {
            paths.push(path);
        }
    }

    // Sort paths like Nautilus file viewer. `paths.sort()` puts "10" before "2"
    alphanumeric_sort::sort_path_slice(&mut paths);
    debug!("Found {} file(s) in {}", paths.len(), directory_path.display());
    Ok(paths)
}

pub fn get_image_paths(directory_path: &Path) -> Result<Vec<PathBuf>> {
    get_paths_with_extensions(directory_path, &IMAGE_EXTENSIONS)
}

pub fn get_xml_paths(directory_path: &Path) -> Result<Vec<PathBuf>> {
    get_paths_with_extensions(directory_path, &XML_EXTENSIONS)
}

/// `<label_dir>/<source stem>.txt`
pub fn label_path_for(label_dir: &Path, source: &Path) -> PathBuf {
    let stem = source.file_stem().unwrap_or_else(|| OsStr::new("labels"));
    let mut file_name = stem.to_os_string();
    file_name.push(".txt");
    label_dir.join(file_name)
}
