use std::path::PathBuf;

/// Errors surfaced by the annotation and conversion pipelines.
///
/// Most of these are reported and skipped at the image or record level; only
/// configuration errors stop a run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The XML document itself could not be read
    #[error("malformed xml: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// The XML document was read but lacks a required element
    #[error("invalid annotation record: {0}")]
    Parse(String),

    #[error("settings error: {0}")]
    Settings(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// An input token that isn't a pointer event or a bound command
    #[error("invalid input {token:?}: {reason}")]
    Input { token: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
