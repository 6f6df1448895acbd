//! Error metadata
//!
//! Every error surfaced to a user describes itself through [`ErrorMetadata`]:
//! a stable machine-readable code, whether the user can recover by retrying,
//! the message to show, and the level it should be logged at. The concrete
//! error enums live in the crates that raise them.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected outcomes like validation rejections
    Debug,
    /// Warning level - for policy states and recoverable failures
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for user-facing errors
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "UPLOAD_FAILED")
    fn error_code(&self) -> &'static str;

    /// Whether the user can recover by re-triggering the action
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// Message shown to the user. Server-provided detail is kept verbatim.
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}
