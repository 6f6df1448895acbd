//! BeatNexus Media Processing Library
//!
//! Probing, file-gate validation and adaptive compression for battle videos,
//! backed by the native `ffprobe` and `ffmpeg` tools.

pub mod compression;
pub mod error;
pub mod metadata;
pub mod probe;
pub mod traits;
pub mod validator;
pub mod video;

// Re-export commonly used types
pub use compression::{
    compression_ratio, needs_compression, CompressionPlan, ContainerProfile, ProgressEstimator,
    CONTAINER_PREFERENCES,
};
pub use error::{CompressionError, ProbeError, ValidationError};
pub use metadata::VideoMetadata;
pub use probe::DurationProber;
pub use traits::{MediaProbe, ProgressCallback, VideoCompressor};
pub use validator::VideoFileValidator;
pub use video::{FFmpegCompressor, FFmpegService};
