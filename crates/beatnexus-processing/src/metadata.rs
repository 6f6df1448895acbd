//! Video metadata types

use beatnexus_core::DurationProbeResult;
use serde::{Deserialize, Serialize};

/// Video metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub codec: String,
    pub bitrate: Option<u64>,
    pub framerate: Option<f32>,
    pub has_audio: bool,
    pub audio_codec: Option<String>,
}

impl VideoMetadata {
    pub fn duration_probe(&self) -> DurationProbeResult {
        DurationProbeResult {
            duration_seconds: self.duration,
            has_audio: self.has_audio,
        }
    }
}
