use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::BYTES_PER_MB;

/// A selected video on disk.
///
/// Replaced wholesale by the compressed derivative when compression runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFile {
    pub path: PathBuf,
    pub name: String,
    pub content_type: String,
    pub size_bytes: u64,
}

impl MediaFile {
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "video".to_string());
        let content_type = content_type_for_path(&path).to_string();
        Self {
            path,
            name,
            content_type,
            size_bytes,
        }
    }

    /// Stat the file and build a `MediaFile` from it
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        Ok(Self::new(path, metadata.len()))
    }

    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / BYTES_PER_MB
    }

    /// Lowercase extension, if any
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    /// File name without its extension
    pub fn base_name(&self) -> &str {
        match self.name.rfind('.') {
            Some(idx) if idx > 0 => &self.name[..idx],
            _ => &self.name,
        }
    }
}

/// MIME type for a video path, from its extension
pub fn content_type_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    match extension.as_deref() {
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("m4v") => "video/x-m4v",
        _ => "application/octet-stream",
    }
}

/// Decoded metadata for one `MediaFile`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationProbeResult {
    pub duration_seconds: f64,
    pub has_audio: bool,
}

/// Why a video was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    DurationTooShort,
    DurationTooLong,
    FileTooLarge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Ok,
    Rejected {
        reason: RejectionReason,
        message: String,
    },
}

impl ValidationOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ValidationOutcome::Ok)
    }

    /// Compression can only fix size, never duration
    pub fn offers_compression(&self) -> bool {
        matches!(
            self,
            ValidationOutcome::Rejected {
                reason: RejectionReason::FileTooLarge,
                ..
            }
        )
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ValidationOutcome::Ok => None,
            ValidationOutcome::Rejected { message, .. } => Some(message),
        }
    }
}

/// One progress report from a compression run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionProgress {
    pub percent: u8,
    pub stage_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<u64>,
}

impl CompressionProgress {
    pub fn stage(percent: u8, stage_label: impl Into<String>) -> Self {
        Self {
            percent: percent.min(100),
            stage_label: stage_label.into(),
            remaining_seconds: None,
        }
    }
}
