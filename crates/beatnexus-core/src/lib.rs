//! BeatNexus Core Library
//!
//! This crate provides the domain models, validation rules, error metadata and
//! configuration shared by every BeatNexus submission component.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::{Config, StorageBackendKind};
pub use error::{ErrorMetadata, LogLevel};
pub use models::{
    BattleFormat, CompressionProgress, CooldownState, DurationProbeResult, DurationRange,
    MediaFile, RejectionReason, SubmissionRequest, SubmissionResult, ValidationOutcome,
};
pub use validation::{is_valid_duration, is_valid_size, validate, validate_video, ValidatedVideo};
