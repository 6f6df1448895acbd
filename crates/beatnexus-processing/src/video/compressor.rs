use crate::compression::{
    output_file_name, select_profile, stage, CompressionPlan, ContainerProfile, ProgressEstimator,
    STAGE_COMPLETE, STAGE_FINALIZING, STAGE_PREPARING, STAGE_STARTING,
};
use crate::error::{CompressionError, ProbeError};
use crate::traits::{MediaProbe, ProgressCallback, VideoCompressor};
use crate::video::service::FFmpegService;
use async_trait::async_trait;
use beatnexus_core::MediaFile;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

/// ffmpeg-backed [`VideoCompressor`] writing into a working directory
pub struct FFmpegCompressor {
    service: FFmpegService,
    prober: Arc<dyn MediaProbe>,
    work_dir: PathBuf,
    encoders: OnceCell<HashSet<String>>,
}

impl FFmpegCompressor {
    pub fn new(service: FFmpegService, prober: Arc<dyn MediaProbe>, work_dir: PathBuf) -> Self {
        Self {
            service,
            prober,
            work_dir,
            encoders: OnceCell::new(),
        }
    }

    async fn encoders(&self) -> Result<&HashSet<String>, CompressionError> {
        self.encoders
            .get_or_try_init(|| self.service.list_encoders())
            .await
    }

    async fn encode(
        &self,
        original: &MediaFile,
        plan: &CompressionPlan,
        partial: &Path,
        output: &Path,
        on_progress: &ProgressCallback,
        cancel: &CancellationToken,
    ) -> Result<&'static ContainerProfile, CompressionError> {
        let profile = select_profile(self.encoders().await?).ok_or_else(|| {
            CompressionError::Unsupported("no webm-capable encoder available".to_string())
        })?;
        tracing::info!(
            mime_type = profile.mime_type,
            ratio = plan.ratio,
            video_bitrate_bps = plan.video_bitrate_bps,
            "Selected container profile"
        );

        tokio::fs::create_dir_all(&self.work_dir).await?;
        if cancel.is_cancelled() {
            return Err(CompressionError::Cancelled);
        }

        on_progress(stage(STAGE_STARTING));
        let args = plan.ffmpeg_args(&original.path, partial, profile);
        self.service
            .run_with_progress(
                &args,
                ProgressEstimator::new(plan.original_duration_seconds),
                on_progress,
                cancel,
            )
            .await?;

        on_progress(stage(STAGE_FINALIZING));
        tokio::fs::rename(partial, output).await?;

        if plan.source_has_audio {
            let probe = self
                .prober
                .probe(output, cancel)
                .await
                .map_err(probe_failure)?;
            if !probe.has_audio {
                return Err(CompressionError::Recording(
                    "compressed output lost the audio track".to_string(),
                ));
            }
        }

        Ok(profile)
    }
}

#[async_trait]
impl VideoCompressor for FFmpegCompressor {
    #[tracing::instrument(skip(self, original, on_progress, cancel), fields(
        file.name = %original.name,
        file.size_mb = original.size_mb()
    ))]
    async fn compress(
        &self,
        original: &MediaFile,
        target_size_mb: f64,
        on_progress: ProgressCallback,
        cancel: &CancellationToken,
    ) -> Result<MediaFile, CompressionError> {
        on_progress(stage(STAGE_PREPARING));

        let probe = self
            .prober
            .probe(&original.path, cancel)
            .await
            .map_err(probe_failure)?;
        let plan = CompressionPlan::from_original(original, probe, target_size_mb)?;

        let output = self.work_dir.join(output_file_name(original));
        let partial = output.with_extension("webm.part");

        let profile = match self
            .encode(original, &plan, &partial, &output, &on_progress, cancel)
            .await
        {
            Ok(profile) => profile,
            Err(e) => {
                discard(&partial).await;
                discard(&output).await;
                return Err(e);
            }
        };

        // The name stays .webm for every profile; the label follows the muxer.
        let mut compressed = MediaFile::from_path(&output).await?;
        compressed.content_type = profile.content_type.to_string();
        tracing::info!(
            original_mb = plan.original_size_mb,
            compressed_mb = compressed.size_mb(),
            target_mb = target_size_mb,
            "Compression pass finished"
        );
        on_progress(stage(STAGE_COMPLETE));
        Ok(compressed)
    }
}

fn probe_failure(e: ProbeError) -> CompressionError {
    match e {
        ProbeError::Cancelled => CompressionError::Cancelled,
        other => CompressionError::Probe(other),
    }
}

async fn discard(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "Discarded partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to discard output"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatnexus_core::{CompressionProgress, DurationProbeResult};
    use std::sync::Mutex;

    const MB: u64 = 1024 * 1024;

    const VP9_ENCODERS: &str = "Encoders:\n V..... = Video\n ------\n \
        V....D libvpx-vp9           libvpx VP9\n A....D libopus              libopus Opus\n";
    const H264_ENCODERS: &str = "Encoders:\n V..... = Video\n ------\n \
        V....D libx264              libx264 H.264\n A....D libopus              libopus Opus\n";

    /// Source always has audio; compressed outputs report `output_has_audio`
    struct FixedMetadata {
        output_has_audio: bool,
    }

    #[async_trait]
    impl MediaProbe for FixedMetadata {
        async fn probe(
            &self,
            path: &Path,
            _cancel: &CancellationToken,
        ) -> Result<DurationProbeResult, ProbeError> {
            let is_output = path.extension().and_then(|e| e.to_str()) == Some("webm");
            Ok(DurationProbeResult {
                duration_seconds: 90.0,
                has_audio: !is_output || self.output_has_audio,
            })
        }
    }

    fn compressor(work_dir: PathBuf, ffmpeg: &str, output_has_audio: bool) -> FFmpegCompressor {
        FFmpegCompressor::new(
            FFmpegService::new(ffmpeg).unwrap(),
            Arc::new(FixedMetadata { output_has_audio }),
            work_dir,
        )
    }

    fn recorder() -> (ProgressCallback, Arc<Mutex<Vec<CompressionProgress>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: ProgressCallback = Arc::new(move |p| sink.lock().unwrap().push(p));
        (callback, seen)
    }

    /// Stand-in ffmpeg: lists `encoders`, records its arguments, reports two
    /// progress blocks and writes the output, then exits with `exit_code`
    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path, encoders: &str, exit_code: i32) -> String {
        use std::os::unix::fs::PermissionsExt;

        let script = format!(
            r#"#!/bin/sh
if [ "$2" = "-encoders" ]; then
  printf '{encoders}'
  exit 0
fi
echo "$@" > "$(dirname "$0")/args"
for last; do :; done
printf 'out_time_us=45000000\nprogress=continue\n'
printf 'webm-bytes' > "$last"
printf 'out_time_us=90000000\nprogress=end\n'
if [ {exit_code} -ne 0 ]; then
  echo "Conversion failed!" >&2
  exit {exit_code}
fi
"#,
            encoders = encoders.replace('\n', "\\n"),
        );
        let path = dir.join("ffmpeg");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().to_string()
    }

    #[tokio::test]
    async fn test_not_needed_when_within_target() {
        let dir = tempfile::tempdir().unwrap();
        let original = MediaFile::new(dir.path().join("take.mp4"), 10 * MB);
        let (callback, seen) = recorder();

        let result = compressor(dir.path().to_path_buf(), "ffmpeg", true)
            .compress(&original, 70.0, callback, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(CompressionError::NotNeeded { .. })));
        assert_eq!(seen.lock().unwrap()[0].percent, 10);
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_is_unsupported_and_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let original = MediaFile::new(dir.path().join("take.mp4"), 100 * MB);
        let (callback, _seen) = recorder();

        let result = compressor(dir.path().join("work"), "/nonexistent/ffmpeg", true)
            .compress(&original, 70.0, callback, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(CompressionError::Unsupported(_))));
        assert!(!dir.path().join("work").join("take_compressed.webm").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_encode_reports_progress_and_renames_output() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = fake_ffmpeg(dir.path(), VP9_ENCODERS, 0);
        let work = dir.path().join("work");
        let original = MediaFile::new(dir.path().join("take.mp4"), 100 * MB);
        let (callback, seen) = recorder();

        let compressed = compressor(work.clone(), &ffmpeg, true)
            .compress(&original, 70.0, callback, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(compressed.path, work.join("take_compressed.webm"));
        assert_eq!(compressed.size_bytes, "webm-bytes".len() as u64);
        assert_eq!(compressed.content_type, "video/webm");
        assert!(!work.join("take_compressed.webm.part").exists());

        let percents: Vec<u8> = seen.lock().unwrap().iter().map(|p| p.percent).collect();
        assert_eq!(percents, vec![10, 20, 80, 95, 100]);
        let encoding = seen.lock().unwrap()[2].clone();
        assert_eq!(encoding.stage_label, "Compressing video...");
        assert!(encoding.remaining_seconds.is_some());

        let args = std::fs::read_to_string(dir.path().join("args")).unwrap();
        assert!(args.contains("-c:v libvpx-vp9"));
        assert!(args.contains("-map 0:a:0"));
        assert!(args.contains("-b:v 1050000"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_encoder_failure_is_recording_error_and_discards_output() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = fake_ffmpeg(dir.path(), VP9_ENCODERS, 1);
        let work = dir.path().join("work");
        let original = MediaFile::new(dir.path().join("take.mp4"), 100 * MB);
        let (callback, _seen) = recorder();

        let result = compressor(work.clone(), &ffmpeg, true)
            .compress(&original, 70.0, callback, &CancellationToken::new())
            .await;

        match result {
            Err(CompressionError::Recording(message)) => {
                assert!(message.contains("Conversion failed!"))
            }
            other => panic!("expected recording error, got {other:?}"),
        }
        assert!(!work.join("take_compressed.webm.part").exists());
        assert!(!work.join("take_compressed.webm").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_lost_audio_track_fails_pass() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = fake_ffmpeg(dir.path(), VP9_ENCODERS, 0);
        let work = dir.path().join("work");
        let original = MediaFile::new(dir.path().join("take.mp4"), 100 * MB);
        let (callback, _seen) = recorder();

        let result = compressor(work.clone(), &ffmpeg, false)
            .compress(&original, 70.0, callback, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(CompressionError::Recording(_))));
        assert!(!work.join("take_compressed.webm").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_h264_fallback_is_labelled_matroska() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = fake_ffmpeg(dir.path(), H264_ENCODERS, 0);
        let original = MediaFile::new(dir.path().join("take.mp4"), 100 * MB);
        let (callback, _seen) = recorder();

        let compressed = compressor(dir.path().join("work"), &ffmpeg, true)
            .compress(&original, 70.0, callback, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(compressed.content_type, "video/x-matroska");
        let args = std::fs::read_to_string(dir.path().join("args")).unwrap();
        assert!(args.contains("-c:v libx264"));
        assert!(args.contains("-f matroska"));
    }
}
