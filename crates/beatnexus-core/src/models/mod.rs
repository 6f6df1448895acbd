//! Domain models for the submission pipeline

pub mod battle;
pub mod cooldown;
pub mod media;
pub mod submission;

pub use battle::{BattleFormat, DurationRange};
pub use cooldown::CooldownState;
pub use media::{
    content_type_for_path, CompressionProgress, DurationProbeResult, MediaFile, RejectionReason,
    ValidationOutcome,
};
pub use submission::{SubmissionRequest, SubmissionResult};
