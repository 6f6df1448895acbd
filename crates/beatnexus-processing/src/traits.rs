//! Seams between the pipeline and the native media tools

use async_trait::async_trait;
use beatnexus_core::{CompressionProgress, DurationProbeResult, MediaFile};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{CompressionError, ProbeError};

/// Receives progress reports during a compression pass
pub type ProgressCallback = Arc<dyn Fn(CompressionProgress) + Send + Sync>;

/// Reads a video's decoded duration
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<DurationProbeResult, ProbeError>;
}

/// Re-encodes an oversized video toward a target size
#[async_trait]
pub trait VideoCompressor: Send + Sync {
    /// Run one compression pass.
    ///
    /// `original` must be the pristine selection, never a previous pass's
    /// output: bitrate math is derived from its size and duration only.
    async fn compress(
        &self,
        original: &MediaFile,
        target_size_mb: f64,
        on_progress: ProgressCallback,
        cancel: &CancellationToken,
    ) -> Result<MediaFile, CompressionError>;
}
