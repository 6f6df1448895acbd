//! Application-wide constants.

/// Hard upload cap, identical for every battle format.
pub const MAX_FILE_SIZE_MB: u64 = 75;

/// `MAX_FILE_SIZE_MB` expressed in bytes (75 MiB).
pub const MAX_FILE_SIZE_BYTES: u64 = MAX_FILE_SIZE_MB * 1024 * 1024;

/// Bytes per megabyte for every size shown to users.
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Default compression target, kept below the cap so one pass usually lands under it.
pub const DEFAULT_COMPRESSION_TARGET_MB: f64 = 70.0;

/// Video extensions accepted by the file gate.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "mkv", "m4v"];

/// Storage bucket that holds battle submissions.
pub const DEFAULT_STORAGE_BUCKET: &str = "videos";

/// Remote procedure that creates a submission after checking the submission cooldown.
pub const RPC_CREATE_SUBMISSION: &str = "create_submission_with_cooldown_check";

/// Remote procedure that reports the caller's current cooldown state.
pub const RPC_COOLDOWN_STATUS: &str = "get_submission_cooldown_status";

/// Edge function that runs matchmaking for a freshly created submission.
pub const SUBMISSION_WEBHOOK_FUNCTION: &str = "submission-webhook";

/// Error code the creation procedure returns while the cooldown is running.
pub const COOLDOWN_ACTIVE_ERROR: &str = "cooldown_active";
