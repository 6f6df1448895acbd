//! FFmpegService - encoder discovery and progress-reporting encode runs

use crate::compression::{parse_encoder_list, ProgressEstimator, ProgressState};
use crate::error::CompressionError;
use crate::probe::validate_tool_path;
use crate::traits::ProgressCallback;
use std::collections::HashSet;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

const STDERR_TAIL_BYTES: usize = 2048;

#[derive(Clone)]
pub struct FFmpegService {
    ffmpeg_path: String,
}

impl FFmpegService {
    pub fn new(ffmpeg_path: impl Into<String>) -> Result<Self, CompressionError> {
        let ffmpeg_path = ffmpeg_path.into();
        validate_tool_path(&ffmpeg_path)
            .map_err(|e| CompressionError::Unsupported(e.to_string()))?;
        Ok(Self { ffmpeg_path })
    }

    /// Encoders compiled into this ffmpeg build
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffmpeg",
        process.executable.path = %self.ffmpeg_path,
        ffmpeg.operation = "list_encoders"
    ))]
    pub async fn list_encoders(&self) -> Result<HashSet<String>, CompressionError> {
        let output = Command::new(&self.ffmpeg_path)
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                CompressionError::Unsupported(format!(
                    "failed to execute {}: {}",
                    self.ffmpeg_path, e
                ))
            })?;

        if !output.status.success() {
            return Err(CompressionError::Unsupported(format!(
                "ffmpeg -encoders failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let encoders = parse_encoder_list(&String::from_utf8_lossy(&output.stdout));
        tracing::debug!(count = encoders.len(), "Discovered ffmpeg encoders");
        Ok(encoders)
    }

    /// Run an encode, reporting progress from `-progress pipe:1`.
    ///
    /// The child is killed when `cancel` fires. Partial output is left for
    /// the caller to remove.
    #[tracing::instrument(skip(self, args, estimator, on_progress, cancel), fields(
        process.executable.name = "ffmpeg",
        process.executable.path = %self.ffmpeg_path,
        ffmpeg.operation = "compress"
    ))]
    pub async fn run_with_progress(
        &self,
        args: &[String],
        estimator: ProgressEstimator,
        on_progress: &ProgressCallback,
        cancel: &CancellationToken,
    ) -> Result<(), CompressionError> {
        let started = Instant::now();

        let mut child = Command::new(&self.ffmpeg_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                CompressionError::Unsupported(format!(
                    "failed to execute {}: {}",
                    self.ffmpeg_path, e
                ))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CompressionError::Recording("ffmpeg stdout unavailable".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| CompressionError::Recording("ffmpeg stderr unavailable".to_string()))?;

        // Drain stderr so ffmpeg never blocks on a full pipe.
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            stderr_tail(&buf)
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut state = ProgressState::default();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = child.kill().await;
                    stderr_task.abort();
                    tracing::info!("Compression cancelled, ffmpeg killed");
                    return Err(CompressionError::Cancelled);
                }
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if let Some((key, value)) = line.split_once('=') {
                        let key = key.trim();
                        state.update(key, value.trim());
                        if key == "progress" && !state.complete {
                            on_progress(estimator.report(state.out_time_secs, started.elapsed()));
                        }
                    }
                }
            }
        }

        let status = tokio::select! {
            _ = cancel.cancelled() => {
                let _ = child.kill().await;
                stderr_task.abort();
                return Err(CompressionError::Cancelled);
            }
            status = child.wait() => status?,
        };

        let stderr = stderr_task.await.unwrap_or_default();
        if !status.success() {
            return Err(CompressionError::Recording(format!(
                "ffmpeg exited with {}: {}",
                status, stderr
            )));
        }

        tracing::info!(
            duration_ms = started.elapsed().as_millis() as u64,
            encoded_seconds = state.out_time_secs,
            "FFmpeg compression completed"
        );
        Ok(())
    }
}

fn stderr_tail(buf: &[u8]) -> String {
    let text = String::from_utf8_lossy(buf);
    let text = text.trim();
    let mut start = text.len().saturating_sub(STDERR_TAIL_BYTES);
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}
