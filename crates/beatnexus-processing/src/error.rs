use thiserror::Error;

/// Duration probe failures
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Media could not be loaded: {0}")]
    MediaLoad(String),

    #[error("Invalid media path: {0}")]
    InvalidPath(String),

    #[error("Probe cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Compression pass failures. Partial output is always discarded.
#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("Compression unsupported: {0}")]
    Unsupported(String),

    #[error("Recording failed: {0}")]
    Recording(String),

    #[error("Compression not needed: {original_mb:.1}MB is already within {target_mb:.1}MB")]
    NotNeeded { original_mb: f64, target_mb: f64 },

    #[error("Compression cancelled")]
    Cancelled,

    #[error("Source probe failed: {0}")]
    Probe(#[from] ProbeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// File gate errors raised before a file is probed
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid file extension: {extension} (allowed: {allowed:?})")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Invalid content type: {content_type} (allowed: video/*)")]
    InvalidContentType { content_type: String },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Empty file")]
    EmptyFile,
}
