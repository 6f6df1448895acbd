//! Adaptive compression planning
//!
//! Everything here is pure: the bitrate budget, container/codec selection,
//! ffmpeg argument construction and progress estimation. The process
//! plumbing lives in [`crate::video`].

use crate::error::CompressionError;
use beatnexus_core::{CompressionProgress, DurationProbeResult, MediaFile};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

pub const MIN_COMPRESSION_RATIO: f64 = 0.05;
pub const MAX_COMPRESSION_RATIO: f64 = 0.8;
pub const OUTPUT_FRAME_RATE: u32 = 15;
pub const BASE_VIDEO_BITRATE_BPS: f64 = 1_500_000.0;
pub const AUDIO_BITRATE_BPS: u64 = 128_000;

pub const STAGE_PREPARING: (u8, &str) = (10, "Preparing compression...");
pub const STAGE_STARTING: (u8, &str) = (20, "Starting compression...");
pub const STAGE_COMPRESSING: &str = "Compressing video...";
pub const STAGE_FINALIZING: (u8, &str) = (95, "Finalizing...");
pub const STAGE_COMPLETE: (u8, &str) = (100, "Complete");

const ENCODING_PERCENT_START: f64 = 70.0;
const ENCODING_PERCENT_SPAN: f64 = 20.0;

/// `target / original`, capped at 0.8 and floored at 0.05
pub fn compression_ratio(target_size_mb: f64, original_size_mb: f64) -> f64 {
    let ratio = target_size_mb / original_size_mb;
    if ratio.is_nan() {
        return MIN_COMPRESSION_RATIO;
    }
    ratio.clamp(MIN_COMPRESSION_RATIO, MAX_COMPRESSION_RATIO)
}

pub fn needs_compression(original_size_mb: f64, target_size_mb: f64) -> bool {
    target_size_mb < original_size_mb
}

pub fn stage(stage: (u8, &str)) -> CompressionProgress {
    CompressionProgress::stage(stage.0, stage.1)
}

/// One entry of the container/codec preference list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerProfile {
    pub mime_type: &'static str,
    /// Content-Type of the file the muxer writes
    pub content_type: &'static str,
    pub muxer: &'static str,
    /// `None` lets ffmpeg pick the muxer's default encoder
    pub video_encoder: Option<&'static str>,
    pub audio_encoder: Option<&'static str>,
}

impl ContainerProfile {
    pub fn is_supported(&self, encoders: &HashSet<String>) -> bool {
        if encoders.is_empty() {
            return false;
        }
        [self.video_encoder, self.audio_encoder]
            .into_iter()
            .flatten()
            .all(|encoder| encoders.contains(encoder))
    }
}

/// Ordered most to least preferred; the first supported entry wins
pub const CONTAINER_PREFERENCES: [ContainerProfile; 4] = [
    ContainerProfile {
        mime_type: "video/webm;codecs=vp9,opus",
        content_type: "video/webm",
        muxer: "webm",
        video_encoder: Some("libvpx-vp9"),
        audio_encoder: Some("libopus"),
    },
    ContainerProfile {
        mime_type: "video/webm;codecs=vp8,opus",
        content_type: "video/webm",
        muxer: "webm",
        video_encoder: Some("libvpx"),
        audio_encoder: Some("libopus"),
    },
    // the webm muxer refuses h264, matroska carries it
    ContainerProfile {
        mime_type: "video/webm;codecs=h264,opus",
        content_type: "video/x-matroska",
        muxer: "matroska",
        video_encoder: Some("libx264"),
        audio_encoder: Some("libopus"),
    },
    ContainerProfile {
        mime_type: "video/webm",
        content_type: "video/webm",
        muxer: "webm",
        video_encoder: None,
        audio_encoder: None,
    },
];

pub fn select_profile(encoders: &HashSet<String>) -> Option<&'static ContainerProfile> {
    CONTAINER_PREFERENCES
        .iter()
        .find(|profile| profile.is_supported(encoders))
}

/// Parse the encoder names out of `ffmpeg -hide_banner -encoders`
pub fn parse_encoder_list(output: &str) -> HashSet<String> {
    output
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("------"))
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let flags = parts.next()?;
            let name = parts.next()?;
            (flags.len() == 6).then(|| name.to_string())
        })
        .collect()
}

/// `<original-base>_compressed.webm`
pub fn output_file_name(original: &MediaFile) -> String {
    format!("{}_compressed.webm", original.base_name())
}

/// Bitrate budget for one pass, derived from the pristine original only
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionPlan {
    pub original_size_mb: f64,
    pub original_duration_seconds: f64,
    pub source_has_audio: bool,
    pub target_size_mb: f64,
    pub ratio: f64,
    pub video_bitrate_bps: u64,
    pub audio_bitrate_bps: u64,
    pub frame_rate: u32,
}

impl CompressionPlan {
    pub fn from_original(
        original: &MediaFile,
        probe: DurationProbeResult,
        target_size_mb: f64,
    ) -> Result<Self, CompressionError> {
        let original_size_mb = original.size_mb();
        if !needs_compression(original_size_mb, target_size_mb) {
            return Err(CompressionError::NotNeeded {
                original_mb: original_size_mb,
                target_mb: target_size_mb,
            });
        }

        let ratio = compression_ratio(target_size_mb, original_size_mb);
        Ok(Self {
            original_size_mb,
            original_duration_seconds: probe.duration_seconds,
            source_has_audio: probe.has_audio,
            target_size_mb,
            ratio,
            video_bitrate_bps: (BASE_VIDEO_BITRATE_BPS * ratio).round() as u64,
            audio_bitrate_bps: AUDIO_BITRATE_BPS,
            frame_rate: OUTPUT_FRAME_RATE,
        })
    }

    /// Arguments for one ffmpeg pass reporting on `-progress pipe:1`
    pub fn ffmpeg_args(
        &self,
        input: &Path,
        output: &Path,
        profile: &ContainerProfile,
    ) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-map".to_string(),
            "0:v:0".to_string(),
        ];

        if self.source_has_audio {
            args.extend_from_slice(&["-map".to_string(), "0:a:0".to_string()]);
        }

        args.extend_from_slice(&["-r".to_string(), self.frame_rate.to_string()]);

        if let Some(encoder) = profile.video_encoder {
            args.extend_from_slice(&["-c:v".to_string(), encoder.to_string()]);
        }
        args.extend_from_slice(&["-b:v".to_string(), self.video_bitrate_bps.to_string()]);

        if self.source_has_audio {
            if let Some(encoder) = profile.audio_encoder {
                args.extend_from_slice(&["-c:a".to_string(), encoder.to_string()]);
            }
            args.extend_from_slice(&["-b:a".to_string(), self.audio_bitrate_bps.to_string()]);
        } else {
            args.push("-an".to_string());
        }

        args.extend_from_slice(&[
            "-f".to_string(),
            profile.muxer.to_string(),
            "-progress".to_string(),
            "pipe:1".to_string(),
            "-nostats".to_string(),
            output.to_string_lossy().to_string(),
        ]);

        args
    }
}

/// Accumulates `key=value` blocks from `ffmpeg -progress`
#[derive(Debug, Default)]
pub struct ProgressState {
    pub out_time_secs: f64,
    pub complete: bool,
}

impl ProgressState {
    pub fn update(&mut self, key: &str, value: &str) {
        match key {
            // out_time_ms is microseconds too
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.parse::<f64>() {
                    if us >= 0.0 {
                        self.out_time_secs = us / 1_000_000.0;
                    }
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

/// Maps encoder position into the 70-90% band of overall progress
#[derive(Debug, Clone, Copy)]
pub struct ProgressEstimator {
    media_duration_seconds: f64,
}

impl ProgressEstimator {
    pub fn new(media_duration_seconds: f64) -> Self {
        Self {
            media_duration_seconds,
        }
    }

    pub fn report(&self, encoded_seconds: f64, elapsed: Duration) -> CompressionProgress {
        let fraction = if self.media_duration_seconds > 0.0 {
            (encoded_seconds / self.media_duration_seconds).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let percent = (ENCODING_PERCENT_START + fraction * ENCODING_PERCENT_SPAN).round() as u8;

        // Extrapolate total wall-clock time from the share encoded so far.
        let remaining_seconds = (fraction > 0.0).then(|| {
            let elapsed = elapsed.as_secs_f64();
            let expected_total = elapsed / fraction;
            (expected_total - elapsed).max(0.0).ceil() as u64
        });

        CompressionProgress {
            percent,
            stage_label: STAGE_COMPRESSING.to_string(),
            remaining_seconds,
        }
    }
}
