//! Battle format validation
//!
//! Pure rules over a measured size and duration. Duration is checked first and
//! independently: a video with the wrong length is rejected with a duration
//! reason even when it is also too large, because compression cannot fix it.

use crate::constants::{BYTES_PER_MB, MAX_FILE_SIZE_BYTES, MAX_FILE_SIZE_MB};
use crate::models::{BattleFormat, DurationProbeResult, MediaFile, RejectionReason, ValidationOutcome};

/// Inclusive range check against the format's duration table
pub fn is_valid_duration(duration_seconds: f64, format: BattleFormat) -> bool {
    duration_seconds.is_finite() && format.duration_range().contains(duration_seconds)
}

pub fn is_valid_size(size_bytes: u64) -> bool {
    size_bytes <= MAX_FILE_SIZE_BYTES
}

/// Validate a measured file size and duration for `format`
pub fn validate(size_bytes: u64, duration_seconds: f64, format: BattleFormat) -> ValidationOutcome {
    let range = format.duration_range();

    if !is_valid_duration(duration_seconds, format) {
        let reason = if duration_seconds > range.max_seconds {
            RejectionReason::DurationTooLong
        } else {
            RejectionReason::DurationTooShort
        };
        return ValidationOutcome::Rejected {
            reason,
            message: format!(
                "Video duration is {} seconds. {} requires {} seconds.",
                format_seconds(duration_seconds),
                format,
                range
            ),
        };
    }

    if !is_valid_size(size_bytes) {
        return ValidationOutcome::Rejected {
            reason: RejectionReason::FileTooLarge,
            message: format!(
                "File size is {:.1}MB. Maximum allowed is {}MB.",
                size_bytes as f64 / BYTES_PER_MB,
                MAX_FILE_SIZE_MB
            ),
        };
    }

    ValidationOutcome::Ok
}

/// Seconds without trailing zeros: 45 -> "45", 59.999 -> "59.999"
fn format_seconds(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "unknown".to_string();
    }
    let formatted = format!("{:.3}", seconds);
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// A video that passed every rule for its format.
///
/// Fields are private; the only way to obtain one is [`validate_video`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedVideo {
    file: MediaFile,
    probe: DurationProbeResult,
    format: BattleFormat,
}

impl ValidatedVideo {
    pub fn file(&self) -> &MediaFile {
        &self.file
    }

    pub fn probe(&self) -> DurationProbeResult {
        self.probe
    }

    pub fn format(&self) -> BattleFormat {
        self.format
    }

    pub fn into_file(self) -> MediaFile {
        self.file
    }
}

/// Validate a probed file, returning the rejection outcome on failure
pub fn validate_video(
    file: MediaFile,
    probe: DurationProbeResult,
    format: BattleFormat,
) -> Result<ValidatedVideo, ValidationOutcome> {
    match validate(file.size_bytes, probe.duration_seconds, format) {
        ValidationOutcome::Ok => Ok(ValidatedVideo {
            file,
            probe,
            format,
        }),
        rejected => Err(rejected),
    }
}
