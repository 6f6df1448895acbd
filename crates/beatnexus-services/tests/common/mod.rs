//! Test doubles for the submission pipeline seams
#![allow(dead_code)]

use async_trait::async_trait;
use beatnexus_api_client::{ApiError, ApiResult};
use beatnexus_core::{
    CompressionProgress, CooldownState, DurationProbeResult, MediaFile, SubmissionRequest,
};
use beatnexus_processing::{CompressionError, ProbeError};
use beatnexus_services::{
    MatchmakingOutcome, MediaProbe, ProgressCallback, Storage, StorageError, SubmissionBackend,
    SubmissionCreateResult, SubmissionService, SubmissionServiceConfig, VideoCompressor,
};
use beatnexus_storage::{StorageBackendKind, StorageResult};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const MB: u64 = 1024 * 1024;

/// Sparse file of `size` bytes named `name` under `dir`
pub async fn video_file(dir: &Path, name: &str, size: u64) -> MediaFile {
    let path = dir.join(name);
    let file = tokio::fs::File::create(&path).await.unwrap();
    file.set_len(size).await.unwrap();
    MediaFile::from_path(&path).await.unwrap()
}

pub fn probe_result(duration_seconds: f64) -> DurationProbeResult {
    DurationProbeResult {
        duration_seconds,
        has_audio: true,
    }
}

pub struct FakeProbe {
    default: DurationProbeResult,
    overrides: Mutex<HashMap<PathBuf, DurationProbeResult>>,
    failing: Mutex<Vec<PathBuf>>,
    hanging: Mutex<Vec<PathBuf>>,
    hang: bool,
    pub calls: Mutex<Vec<PathBuf>>,
}

impl FakeProbe {
    pub fn new(duration_seconds: f64) -> Self {
        Self {
            default: probe_result(duration_seconds),
            overrides: Mutex::new(HashMap::new()),
            failing: Mutex::new(Vec::new()),
            hanging: Mutex::new(Vec::new()),
            hang: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Probe that never returns until cancelled
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::new(90.0)
        }
    }

    pub fn set(&self, path: impl Into<PathBuf>, duration_seconds: f64) {
        self.overrides
            .lock()
            .unwrap()
            .insert(path.into(), probe_result(duration_seconds));
    }

    /// Probing `path` blocks until cancelled
    pub fn hang_on(&self, path: impl Into<PathBuf>) {
        self.hanging.lock().unwrap().push(path.into());
    }

    pub fn fail_on(&self, path: impl Into<PathBuf>) {
        self.failing.lock().unwrap().push(path.into());
    }
}

#[async_trait]
impl MediaProbe for FakeProbe {
    async fn probe(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<DurationProbeResult, ProbeError> {
        self.calls.lock().unwrap().push(path.to_path_buf());
        let hangs = self.hang || self.hanging.lock().unwrap().iter().any(|p| p == path);
        if hangs {
            cancel.cancelled().await;
            return Err(ProbeError::Cancelled);
        }
        if self.failing.lock().unwrap().iter().any(|p| p == path) {
            return Err(ProbeError::MediaLoad("Invalid data found when processing input".into()));
        }
        Ok(self
            .overrides
            .lock()
            .unwrap()
            .get(path)
            .copied()
            .unwrap_or(self.default))
    }
}

#[derive(Debug, Clone)]
pub struct CompressCall {
    pub original: PathBuf,
    pub target_mb: f64,
}

/// Writes one output per pass, sized from `output_sizes` in order
pub struct FakeCompressor {
    dir: TempDir,
    output_sizes: Mutex<VecDeque<u64>>,
    content_type: Option<String>,
    unsupported: bool,
    pub calls: Mutex<Vec<CompressCall>>,
    pub outputs: Mutex<Vec<PathBuf>>,
}

impl FakeCompressor {
    pub fn new(output_sizes: &[u64]) -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            output_sizes: Mutex::new(output_sizes.iter().copied().collect()),
            content_type: None,
            unsupported: false,
            calls: Mutex::new(Vec::new()),
            outputs: Mutex::new(Vec::new()),
        }
    }

    /// Label outputs the way a Matroska-muxed pass does
    pub fn labelled(output_sizes: &[u64], content_type: &str) -> Self {
        Self {
            content_type: Some(content_type.to_string()),
            ..Self::new(output_sizes)
        }
    }

    pub fn unsupported() -> Self {
        Self {
            unsupported: true,
            ..Self::new(&[])
        }
    }

    pub fn calls(&self) -> Vec<CompressCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn outputs(&self) -> Vec<PathBuf> {
        self.outputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoCompressor for FakeCompressor {
    async fn compress(
        &self,
        original: &MediaFile,
        target_size_mb: f64,
        on_progress: ProgressCallback,
        cancel: &CancellationToken,
    ) -> Result<MediaFile, CompressionError> {
        self.calls.lock().unwrap().push(CompressCall {
            original: original.path.clone(),
            target_mb: target_size_mb,
        });
        if self.unsupported {
            return Err(CompressionError::Unsupported(
                "no WebM-capable encoder available".into(),
            ));
        }
        if cancel.is_cancelled() {
            return Err(CompressionError::Cancelled);
        }

        on_progress(CompressionProgress::stage(10, "Preparing compression..."));
        let size = self
            .output_sizes
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| CompressionError::Recording("no output configured".into()))?;

        let pass = self.calls.lock().unwrap().len();
        let path = self
            .dir
            .path()
            .join(format!("{}_compressed_{}.webm", original.base_name(), pass));
        let file = tokio::fs::File::create(&path).await?;
        file.set_len(size).await?;
        self.outputs.lock().unwrap().push(path.clone());

        on_progress(CompressionProgress::stage(100, "Complete"));
        let mut compressed = MediaFile::from_path(&path).await?;
        if let Some(content_type) = &self.content_type {
            compressed.content_type = content_type.clone();
        }
        Ok(compressed)
    }
}

#[derive(Debug, Clone)]
pub struct Upload {
    pub owner_id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub size: usize,
}

#[derive(Default)]
pub struct FakeStorage {
    pub fail: bool,
    pub uploads: Mutex<Vec<Upload>>,
}

impl FakeStorage {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl Storage for FakeStorage {
    async fn upload(
        &self,
        owner_id: Uuid,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<String> {
        if self.fail {
            return Err(StorageError::UploadFailed("bucket not found".into()));
        }
        self.uploads.lock().unwrap().push(Upload {
            owner_id,
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            size: data.len(),
        });
        Ok(format!("{}/{}", owner_id, filename))
    }

    fn public_url(&self, storage_key: &str) -> StorageResult<String> {
        Ok(format!("https://cdn.test/videos/{}", storage_key))
    }

    fn backend_type(&self) -> StorageBackendKind {
        StorageBackendKind::Local
    }
}

pub struct FakeBackend {
    pub create: SubmissionCreateResult,
    pub matchmaking: Result<MatchmakingOutcome, String>,
    pub cooldown: CooldownState,
    pub create_calls: Mutex<Vec<SubmissionRequest>>,
    pub matchmaking_calls: Mutex<Vec<Uuid>>,
    pub cooldown_calls: Mutex<Vec<Uuid>>,
}

impl FakeBackend {
    pub fn new(create: SubmissionCreateResult, matchmaking: MatchmakingOutcome) -> Self {
        Self {
            create,
            matchmaking: Ok(matchmaking),
            cooldown: CooldownState::ready(),
            create_calls: Mutex::new(Vec::new()),
            matchmaking_calls: Mutex::new(Vec::new()),
            cooldown_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn battle_created(submission_id: Uuid, battle_id: Uuid) -> Self {
        Self::new(
            SubmissionCreateResult::Created(submission_id),
            MatchmakingOutcome::BattleCreated {
                battle_id: Some(battle_id),
                message: "Battle created".into(),
            },
        )
    }

    pub fn waiting(submission_id: Uuid) -> Self {
        Self::new(
            SubmissionCreateResult::Created(submission_id),
            MatchmakingOutcome::WaitingForOpponent {
                message: "Submission received, waiting for opponent".into(),
            },
        )
    }

    pub fn create_calls(&self) -> Vec<SubmissionRequest> {
        self.create_calls.lock().unwrap().clone()
    }

    pub fn matchmaking_calls(&self) -> Vec<Uuid> {
        self.matchmaking_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SubmissionBackend for FakeBackend {
    async fn create_submission(
        &self,
        request: &SubmissionRequest,
    ) -> ApiResult<SubmissionCreateResult> {
        self.create_calls.lock().unwrap().push(request.clone());
        Ok(self.create.clone())
    }

    async fn cooldown_status(&self, user_id: Uuid) -> ApiResult<CooldownState> {
        self.cooldown_calls.lock().unwrap().push(user_id);
        Ok(self.cooldown.clone())
    }

    async fn trigger_matchmaking(&self, submission_id: Uuid) -> ApiResult<MatchmakingOutcome> {
        self.matchmaking_calls.lock().unwrap().push(submission_id);
        self.matchmaking.clone().map_err(|body| ApiError::Status {
            status: 500,
            body,
        })
    }
}

pub struct Harness {
    pub probe: Arc<FakeProbe>,
    pub compressor: Arc<FakeCompressor>,
    pub storage: Arc<FakeStorage>,
    pub backend: Arc<FakeBackend>,
    pub service: Arc<SubmissionService>,
}

impl Harness {
    pub fn new(probe: FakeProbe, compressor: FakeCompressor, storage: FakeStorage, backend: FakeBackend) -> Self {
        let probe = Arc::new(probe);
        let compressor = Arc::new(compressor);
        let storage = Arc::new(storage);
        let backend = Arc::new(backend);
        let config = SubmissionServiceConfig {
            progress_poll_interval: Duration::from_millis(5),
            ..SubmissionServiceConfig::default()
        };
        let service = Arc::new(SubmissionService::new(
            probe.clone(),
            compressor.clone(),
            storage.clone(),
            backend.clone(),
            config,
        ));
        Self {
            probe,
            compressor,
            storage,
            backend,
            service,
        }
    }
}

#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<beatnexus_services::FlowEvent>>>);

impl EventLog {
    pub fn callback(&self) -> beatnexus_services::EventCallback {
        let log = self.0.clone();
        Arc::new(move |event| log.lock().unwrap().push(event))
    }

    pub fn events(&self) -> Vec<beatnexus_services::FlowEvent> {
        self.0.lock().unwrap().clone()
    }
}
