//! Submission flow errors
//!
//! Every step of the pipeline fails with its own variant so callers can tell
//! an upload failure from a rejected record or a failed webhook. Remote
//! detail is carried verbatim in the message.

use beatnexus_api_client::ApiError;
use beatnexus_core::{CooldownState, ErrorMetadata, LogLevel, ValidationOutcome};
use beatnexus_processing::{CompressionError, ProbeError, ValidationError};
use beatnexus_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Invalid video file: {0}")]
    InvalidFile(#[from] ValidationError),

    #[error("Video could not be read: {0}")]
    MediaLoad(ProbeError),

    #[error("{}", .0.message().unwrap_or("Video rejected"))]
    Rejected(ValidationOutcome),

    #[error("Compression unavailable: {0}")]
    CompressionUnsupported(String),

    #[error("Compression failed: {0}")]
    CompressionFailed(CompressionError),

    #[error("Compressed video is still {size_mb:.1}MB after {passes} passes. Please record a shorter or lower-quality video.")]
    CompressionExhausted { size_mb: f64, passes: u32 },

    #[error("Upload failed: {0}")]
    Upload(StorageError),

    #[error("Could not resolve the video URL: {0}")]
    PublicUrl(StorageError),

    #[error("{}", cooldown_message(.state, .message))]
    CooldownActive {
        state: CooldownState,
        message: String,
    },

    #[error("Submission failed: {0}")]
    CreateFailed(String),

    #[error("Submission request failed: {0}")]
    CreateRequest(ApiError),

    #[error("Matchmaking failed: {0}")]
    Matchmaking(ApiError),

    #[error("Could not load cooldown status: {0}")]
    CooldownStatus(ApiError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Submission cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Remaining time from the refreshed state, server text kept as detail
fn cooldown_message(state: &CooldownState, detail: &str) -> String {
    let message = state.message();
    let detail = detail.trim();
    if detail.is_empty() || detail == message {
        message
    } else {
        format!("{} ({})", message, detail)
    }
}

impl SubmissionError {
    pub fn from_probe(e: ProbeError) -> Self {
        match e {
            ProbeError::Cancelled => SubmissionError::Cancelled,
            other => SubmissionError::MediaLoad(other),
        }
    }

    pub fn from_compression(e: CompressionError) -> Self {
        match e {
            CompressionError::Cancelled | CompressionError::Probe(ProbeError::Cancelled) => {
                SubmissionError::Cancelled
            }
            CompressionError::Unsupported(reason) => SubmissionError::CompressionUnsupported(reason),
            other => SubmissionError::CompressionFailed(other),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SubmissionError::Cancelled)
    }
}

impl ErrorMetadata for SubmissionError {
    fn error_code(&self) -> &'static str {
        match self {
            SubmissionError::InvalidFile(_) => "INVALID_FILE",
            SubmissionError::MediaLoad(_) => "MEDIA_LOAD_FAILED",
            SubmissionError::Rejected(_) => "VALIDATION_REJECTED",
            SubmissionError::CompressionUnsupported(_) => "COMPRESSION_UNSUPPORTED",
            SubmissionError::CompressionFailed(_) => "COMPRESSION_FAILED",
            SubmissionError::CompressionExhausted { .. } => "COMPRESSION_EXHAUSTED",
            SubmissionError::Upload(_) => "UPLOAD_FAILED",
            SubmissionError::PublicUrl(_) => "PUBLIC_URL_FAILED",
            SubmissionError::CooldownActive { .. } => "COOLDOWN_ACTIVE",
            SubmissionError::CreateFailed(_) => "SUBMISSION_FAILED",
            SubmissionError::CreateRequest(_) => "SUBMISSION_REQUEST_FAILED",
            SubmissionError::Matchmaking(_) => "MATCHMAKING_FAILED",
            SubmissionError::CooldownStatus(_) => "COOLDOWN_STATUS_FAILED",
            SubmissionError::Config(_) => "CONFIG_ERROR",
            SubmissionError::Cancelled => "CANCELLED",
            SubmissionError::Io(_) => "IO_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            SubmissionError::Rejected(_)
                | SubmissionError::CompressionExhausted { .. }
                | SubmissionError::Config(_)
        )
    }

    fn suggested_action(&self) -> Option<&'static str> {
        match self {
            SubmissionError::InvalidFile(_) | SubmissionError::MediaLoad(_) => {
                Some("Select a different video file")
            }
            SubmissionError::Rejected(outcome) if outcome.offers_compression() => {
                Some("Compress the video and try again")
            }
            SubmissionError::Rejected(_) | SubmissionError::CompressionExhausted { .. } => {
                Some("Record a new video")
            }
            SubmissionError::CompressionUnsupported(_) | SubmissionError::CompressionFailed(_) => {
                Some("Retry compression or select a smaller file")
            }
            SubmissionError::CooldownActive { .. } => Some("Wait for the cooldown to end"),
            SubmissionError::Upload(_)
            | SubmissionError::PublicUrl(_)
            | SubmissionError::CreateRequest(_)
            | SubmissionError::Matchmaking(_)
            | SubmissionError::CooldownStatus(_) => Some("Check your connection and resubmit"),
            SubmissionError::Config(_) => Some("Check the BeatNexus configuration"),
            _ => None,
        }
    }

    fn client_message(&self) -> String {
        self.to_string()
    }

    fn log_level(&self) -> LogLevel {
        match self {
            SubmissionError::Rejected(_) | SubmissionError::Cancelled => LogLevel::Debug,
            SubmissionError::InvalidFile(_)
            | SubmissionError::CooldownActive { .. }
            | SubmissionError::CompressionExhausted { .. } => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}
