//! Submission orchestration: probe → validate → [compress]* → upload →
//! create record → matchmaking.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use beatnexus_api_client::{ApiClient, MatchmakingOutcome, SubmissionBackend, SubmissionCreateResult};
use beatnexus_core::{
    validate_video, BattleFormat, Config, CooldownState, DurationProbeResult, MediaFile,
    SubmissionRequest, SubmissionResult, ValidatedVideo, ValidationOutcome,
};
use beatnexus_processing::{
    DurationProber, FFmpegCompressor, FFmpegService, MediaProbe, VideoCompressor,
    VideoFileValidator,
};
use beatnexus_storage::{create_storage, Storage};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::SubmissionError;
use crate::events::{EventCallback, FlowEvent};
use crate::progress::ProgressRelay;

const MAX_COMPRESSION_PASSES: u32 = 2;
const RETRY_TARGET_FACTOR: f64 = 0.8;
const PROGRESS_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct SubmissionServiceConfig {
    pub compression_target_mb: f64,
    /// Initial pass plus retries
    pub max_compression_passes: u32,
    /// Each retry targets `previous_target * retry_target_factor`
    pub retry_target_factor: f64,
    pub progress_poll_interval: Duration,
}

impl Default for SubmissionServiceConfig {
    fn default() -> Self {
        Self {
            compression_target_mb: beatnexus_core::constants::DEFAULT_COMPRESSION_TARGET_MB,
            max_compression_passes: MAX_COMPRESSION_PASSES,
            retry_target_factor: RETRY_TARGET_FACTOR,
            progress_poll_interval: PROGRESS_POLL_INTERVAL,
        }
    }
}

impl SubmissionServiceConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            compression_target_mb: config.compression_target_mb,
            ..Self::default()
        }
    }
}

/// Outcome of the initial probe and validation
#[derive(Debug, Clone)]
pub enum Preparation {
    Ready(ValidatedVideo),
    /// Duration is fine but the file is over the cap
    CompressionOffered {
        original: MediaFile,
        probe: DurationProbeResult,
        outcome: ValidationOutcome,
    },
}

pub struct SubmissionService {
    probe: Arc<dyn MediaProbe>,
    compressor: Arc<dyn VideoCompressor>,
    storage: Arc<dyn Storage>,
    backend: Arc<dyn SubmissionBackend>,
    gate: VideoFileValidator,
    config: SubmissionServiceConfig,
}

impl SubmissionService {
    pub fn new(
        probe: Arc<dyn MediaProbe>,
        compressor: Arc<dyn VideoCompressor>,
        storage: Arc<dyn Storage>,
        backend: Arc<dyn SubmissionBackend>,
        config: SubmissionServiceConfig,
    ) -> Self {
        Self {
            probe,
            compressor,
            storage,
            backend,
            gate: VideoFileValidator::default(),
            config,
        }
    }

    /// Wire the ffprobe/ffmpeg tools, the configured storage backend and the
    /// backend API client together
    pub async fn from_config(config: &Config) -> Result<Self, SubmissionError> {
        let prober: Arc<dyn MediaProbe> = Arc::new(
            DurationProber::new(config.ffprobe_path.clone())
                .map_err(|e| SubmissionError::Config(e.to_string()))?,
        );
        let ffmpeg = FFmpegService::new(config.ffmpeg_path.clone())
            .map_err(|e| SubmissionError::Config(e.to_string()))?;
        let compressor = Arc::new(FFmpegCompressor::new(
            ffmpeg,
            prober.clone(),
            config.work_dir.clone(),
        ));
        let storage = create_storage(config)
            .await
            .map_err(|e| SubmissionError::Config(e.to_string()))?;
        let backend = Arc::new(
            ApiClient::from_config(config).map_err(|e| SubmissionError::Config(e.to_string()))?,
        );

        Ok(Self::new(
            prober,
            compressor,
            storage,
            backend,
            SubmissionServiceConfig::from_config(config),
        ))
    }

    async fn probe_file(
        &self,
        file: &MediaFile,
        cancel: &CancellationToken,
    ) -> Result<DurationProbeResult, SubmissionError> {
        self.probe
            .probe(&file.path, cancel)
            .await
            .map_err(SubmissionError::from_probe)
    }

    /// Gate, probe and validate a freshly selected file
    #[tracing::instrument(skip_all, fields(file.name = %file.name, battle_format = %format))]
    pub async fn prepare(
        &self,
        file: MediaFile,
        format: BattleFormat,
        events: &EventCallback,
        cancel: &CancellationToken,
    ) -> Result<Preparation, SubmissionError> {
        ensure_active(cancel)?;
        self.gate.validate_file(&file)?;

        events(FlowEvent::Probing);
        let probe = self.probe_file(&file, cancel).await?;

        match validate_video(file.clone(), probe, format) {
            Ok(validated) => {
                events(FlowEvent::Validated {
                    duration_seconds: probe.duration_seconds,
                    size_mb: file.size_mb(),
                });
                Ok(Preparation::Ready(validated))
            }
            Err(outcome) if outcome.offers_compression() => {
                tracing::info!(size_mb = file.size_mb(), "Video over size cap, compression offered");
                Ok(Preparation::CompressionOffered {
                    original: file,
                    probe,
                    outcome,
                })
            }
            Err(outcome) => {
                tracing::info!(
                    duration_seconds = probe.duration_seconds,
                    "Video rejected on duration"
                );
                Err(SubmissionError::Rejected(outcome))
            }
        }
    }

    /// Compress `original` until it fits under the cap.
    ///
    /// Every pass is computed from the pristine original; a retry only
    /// lowers the target. Intermediate outputs that miss the cap are removed.
    #[tracing::instrument(skip_all, fields(file.name = %original.name, original_mb = original.size_mb()))]
    pub async fn compress(
        &self,
        original: &MediaFile,
        format: BattleFormat,
        events: &EventCallback,
        cancel: &CancellationToken,
    ) -> Result<ValidatedVideo, SubmissionError> {
        let mut target_mb = self.config.compression_target_mb;
        let mut last_size_mb = original.size_mb();

        for pass in 1..=self.config.max_compression_passes {
            ensure_active(cancel)?;
            tracing::info!(pass, target_mb, "Starting compression pass");

            let relay =
                ProgressRelay::start(self.config.progress_poll_interval, cancel, events.clone());
            let result = self
                .compressor
                .compress(original, target_mb, relay.callback(), cancel)
                .await;
            relay.finish().await;

            let compressed = result.map_err(SubmissionError::from_compression)?;
            events(FlowEvent::CompressionPassFinished {
                pass,
                size_mb: compressed.size_mb(),
            });

            let probe = match self.probe_file(&compressed, cancel).await {
                Ok(probe) => probe,
                Err(e) => {
                    discard(&compressed.path).await;
                    return Err(e);
                }
            };

            match validate_video(compressed.clone(), probe, format) {
                Ok(validated) => {
                    events(FlowEvent::Validated {
                        duration_seconds: probe.duration_seconds,
                        size_mb: compressed.size_mb(),
                    });
                    return Ok(validated);
                }
                Err(outcome) if outcome.offers_compression() => {
                    tracing::warn!(
                        pass,
                        compressed_mb = compressed.size_mb(),
                        "Compressed video still over the cap"
                    );
                    last_size_mb = compressed.size_mb();
                    discard(&compressed.path).await;
                    target_mb *= self.config.retry_target_factor;
                }
                Err(outcome) => {
                    discard(&compressed.path).await;
                    return Err(SubmissionError::Rejected(outcome));
                }
            }
        }

        Err(SubmissionError::CompressionExhausted {
            size_mb: last_size_mb,
            passes: self.config.max_compression_passes,
        })
    }

    /// Upload a validated file and create the submission.
    ///
    /// The file is re-read and re-validated first, so a file that changed on
    /// disk since it was prepared is caught before anything is uploaded.
    #[tracing::instrument(skip_all, fields(file.name = %file.name, user_id = %user_id, battle_format = %format))]
    pub async fn submit(
        &self,
        file: &MediaFile,
        user_id: Uuid,
        format: BattleFormat,
        events: &EventCallback,
        cancel: &CancellationToken,
    ) -> Result<SubmissionResult, SubmissionError> {
        ensure_active(cancel)?;
        // size is re-read, the label stays whatever the producer set
        let current = MediaFile {
            content_type: file.content_type.clone(),
            ..MediaFile::from_path(&file.path).await?
        };
        self.gate.validate_file(&current)?;
        let probe = self.probe_file(&current, cancel).await?;
        let validated =
            validate_video(current, probe, format).map_err(SubmissionError::Rejected)?;

        let video = validated.file();
        let data = tokio::fs::read(&video.path).await?;

        ensure_active(cancel)?;
        events(FlowEvent::Uploading {
            size_mb: video.size_mb(),
        });
        let storage_key = until_cancelled(
            cancel,
            self.storage
                .upload(user_id, &video.name, &video.content_type, data),
        )
        .await?
        .map_err(SubmissionError::Upload)?;

        let video_url = self
            .storage
            .public_url(&storage_key)
            .map_err(SubmissionError::PublicUrl)?;
        tracing::info!(storage_key = %storage_key, "Video uploaded");

        let request = SubmissionRequest::new(user_id, &validated, video_url);

        ensure_active(cancel)?;
        events(FlowEvent::CreatingSubmission);
        let created = until_cancelled(cancel, self.backend.create_submission(&request))
            .await?
            .map_err(SubmissionError::CreateRequest)?;

        let submission_id = match created {
            SubmissionCreateResult::Created(id) => id,
            SubmissionCreateResult::CooldownActive {
                remaining_minutes,
                message,
            } => {
                let state = self
                    .refresh_cooldown(user_id, remaining_minutes, cancel)
                    .await;
                tracing::warn!(
                    remaining_minutes = state.remaining_minutes,
                    "Submission refused, cooldown active"
                );
                return Err(SubmissionError::CooldownActive { state, message });
            }
            SubmissionCreateResult::Failure { reason } => {
                return Err(SubmissionError::CreateFailed(reason));
            }
        };

        ensure_active(cancel)?;
        events(FlowEvent::Matchmaking { submission_id });
        let outcome = until_cancelled(cancel, self.backend.trigger_matchmaking(submission_id))
            .await?
            .map_err(SubmissionError::Matchmaking)?;

        let result = match outcome {
            MatchmakingOutcome::BattleCreated { battle_id, message } => {
                SubmissionResult::BattleCreated {
                    submission_id,
                    battle_id,
                    message,
                }
            }
            MatchmakingOutcome::WaitingForOpponent { message } => {
                SubmissionResult::WaitingForOpponent {
                    submission_id,
                    message,
                }
            }
        };

        tracing::info!(
            submission_id = %submission_id,
            waiting = result.is_waiting(),
            "Submission completed"
        );
        Ok(result)
    }

    /// The whole flow for one selected file.
    ///
    /// With `allow_compression` off an oversized file is returned as its
    /// size rejection.
    pub async fn run(
        &self,
        file: MediaFile,
        user_id: Uuid,
        format: BattleFormat,
        allow_compression: bool,
        events: &EventCallback,
        cancel: &CancellationToken,
    ) -> Result<SubmissionResult, SubmissionError> {
        let (validated, compressed) = match self.prepare(file, format, events, cancel).await? {
            Preparation::Ready(validated) => (validated, false),
            Preparation::CompressionOffered {
                original, outcome, ..
            } => {
                if !allow_compression {
                    return Err(SubmissionError::Rejected(outcome));
                }
                events(FlowEvent::CompressionOffered {
                    message: outcome.message().unwrap_or_default().to_string(),
                });
                (self.compress(&original, format, events, cancel).await?, true)
            }
        };

        let result = self
            .submit(validated.file(), user_id, format, events, cancel)
            .await;

        if compressed {
            discard(&validated.file().path).await;
        }
        result
    }

    /// Current cooldown for `user_id`
    pub async fn cooldown_status(&self, user_id: Uuid) -> Result<CooldownState, SubmissionError> {
        self.backend
            .cooldown_status(user_id)
            .await
            .map_err(SubmissionError::CooldownStatus)
    }

    // Falls back to the procedure's own figure when the status call fails.
    async fn refresh_cooldown(
        &self,
        user_id: Uuid,
        remaining_minutes: u32,
        cancel: &CancellationToken,
    ) -> CooldownState {
        let reported = CooldownState::active(remaining_minutes);
        match until_cancelled(cancel, self.backend.cooldown_status(user_id)).await {
            Ok(Ok(state)) if !state.can_submit => state,
            Ok(Ok(state)) => CooldownState {
                last_submission_at: state.last_submission_at,
                ..reported
            },
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Failed to refresh cooldown status");
                reported
            }
            Err(_) => reported,
        }
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<(), SubmissionError> {
    if cancel.is_cancelled() {
        return Err(SubmissionError::Cancelled);
    }
    Ok(())
}

/// Await `fut` unless `cancel` fires first; the pending request is dropped
async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, SubmissionError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(SubmissionError::Cancelled),
        output = fut => Ok(output),
    }
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove compressed file");
        }
    }
}
