//! Duration prober - ffprobe-backed metadata extraction

use crate::error::ProbeError;
use crate::metadata::VideoMetadata;
use crate::traits::MediaProbe;
use async_trait::async_trait;
use beatnexus_core::DurationProbeResult;
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Reject media paths that climb out of their directory.
///
/// Arguments never pass through a shell, so any file name is allowed.
pub(crate) fn validate_media_path(path: &Path) -> Result<(), ProbeError> {
    if path.as_os_str().is_empty() {
        return Err(ProbeError::InvalidPath("empty path".to_string()));
    }

    if path.components().any(|c| c == Component::ParentDir) {
        return Err(ProbeError::InvalidPath(format!(
            "path contains directory traversal: {}",
            path.display()
        )));
    }

    Ok(())
}

/// Validate a tool path such as `ffprobe` or `/usr/local/bin/ffmpeg`
pub(crate) fn validate_tool_path(tool_path: &str) -> Result<(), ProbeError> {
    if tool_path.is_empty()
        || !tool_path.chars().all(|c| {
            c.is_alphanumeric() || c == '/' || c == '-' || c == '_' || c == '.' || c == '\\'
        })
    {
        return Err(ProbeError::InvalidPath(format!(
            "unsafe tool path: {}",
            tool_path
        )));
    }
    validate_media_path(Path::new(tool_path))
}

fn validate_and_canonicalize_path(path: &Path) -> Result<PathBuf, ProbeError> {
    validate_media_path(path)?;
    path.canonicalize()
        .map_err(|e| ProbeError::MediaLoad(format!("{}: {}", path.display(), e)))
}

pub struct DurationProber {
    ffprobe_path: String,
}

impl DurationProber {
    pub fn new(ffprobe_path: impl Into<String>) -> Result<Self, ProbeError> {
        let ffprobe_path = ffprobe_path.into();
        validate_tool_path(&ffprobe_path)?;
        Ok(Self { ffprobe_path })
    }

    /// Probe in-memory bytes through a temporary copy.
    ///
    /// The temp file is removed when this returns, on success or failure.
    pub async fn probe_bytes(
        &self,
        data: &[u8],
        cancel: &CancellationToken,
    ) -> Result<VideoMetadata, ProbeError> {
        let temp_file = tempfile::NamedTempFile::new()?;
        tokio::fs::write(temp_file.path(), data).await?;
        self.probe_metadata(temp_file.path(), cancel).await
    }

    /// Full ffprobe metadata for a file on disk
    #[tracing::instrument(skip(self, cancel), fields(
        process.executable.name = "ffprobe",
        process.executable.path = %self.ffprobe_path,
        ffmpeg.operation = "probe"
    ))]
    pub async fn probe_metadata(
        &self,
        video_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<VideoMetadata, ProbeError> {
        if cancel.is_cancelled() {
            return Err(ProbeError::Cancelled);
        }

        let start = std::time::Instant::now();
        let validated_path = validate_and_canonicalize_path(video_path)?;

        let run = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(&validated_path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        // Dropping the pending future kills the child.
        let output = tokio::select! {
            _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
            output = run => output.map_err(|e| {
                ProbeError::MediaLoad(format!("failed to execute {}: {}", self.ffprobe_path, e))
            })?,
        };

        if !output.status.success() {
            return Err(ProbeError::MediaLoad(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let metadata = parse_ffprobe_output(&output.stdout)?;

        tracing::info!(
            duration_ms = start.elapsed().as_millis() as u64,
            video_duration = metadata.duration,
            width = metadata.width,
            height = metadata.height,
            codec = %metadata.codec,
            has_audio = metadata.has_audio,
            "Video probe completed"
        );

        Ok(metadata)
    }
}

#[async_trait]
impl MediaProbe for DurationProber {
    async fn probe(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<DurationProbeResult, ProbeError> {
        Ok(self.probe_metadata(path, cancel).await?.duration_probe())
    }
}

/// Decode `ffprobe -print_format json -show_format -show_streams` output
pub(crate) fn parse_ffprobe_output(stdout: &[u8]) -> Result<VideoMetadata, ProbeError> {
    let probe_data: serde_json::Value = serde_json::from_slice(stdout)
        .map_err(|e| ProbeError::MediaLoad(format!("failed to parse ffprobe output: {}", e)))?;

    let streams = probe_data["streams"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default();

    let stream = streams
        .iter()
        .find(|s| s["codec_type"].as_str() == Some("video"))
        .ok_or_else(|| ProbeError::MediaLoad("no video stream found".to_string()))?;

    let audio_stream = streams
        .iter()
        .find(|s| s["codec_type"].as_str() == Some("audio"));

    let format = &probe_data["format"];

    let duration = parse_seconds(&format["duration"])
        .or_else(|| parse_seconds(&stream["duration"]))
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| ProbeError::MediaLoad("could not parse duration".to_string()))?;

    let width = stream["width"].as_u64().unwrap_or(0) as u32;
    let height = stream["height"].as_u64().unwrap_or(0) as u32;

    let codec = stream["codec_name"]
        .as_str()
        .unwrap_or("unknown")
        .to_string();

    let bitrate = format["bit_rate"]
        .as_str()
        .and_then(|b| b.parse::<u64>().ok());

    let framerate = stream["r_frame_rate"].as_str().and_then(|r| {
        let (num, den) = r.split_once('/')?;
        let num: f32 = num.parse().ok()?;
        let den: f32 = den.parse().ok()?;
        if den != 0.0 {
            Some(num / den)
        } else {
            None
        }
    });

    Ok(VideoMetadata {
        duration,
        width,
        height,
        codec,
        bitrate,
        framerate,
        has_audio: audio_stream.is_some(),
        audio_codec: audio_stream
            .and_then(|s| s["codec_name"].as_str())
            .map(str::to_string),
    })
}

// ffprobe reports durations as strings; tolerate numbers too
fn parse_seconds(value: &serde_json::Value) -> Option<f64> {
    value
        .as_str()
        .and_then(|d| d.parse::<f64>().ok())
        .or_else(|| value.as_f64())
}
