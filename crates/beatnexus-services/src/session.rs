//! One live submission flow at a time.
//!
//! Starting a new flow cancels the one in progress. Every published state
//! carries the id of the flow that produced it, and a superseded flow can
//! no longer publish, so observers never see a stale result.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use beatnexus_core::{BattleFormat, CooldownState, ErrorMetadata, MediaFile, SubmissionResult};
use beatnexus_infra::{ScheduledTask, TickControl};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::SubmissionError;
use crate::events::{EventCallback, FlowEvent};
use crate::pipeline::SubmissionService;

const COOLDOWN_TICK: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    InProgress { flow_id: u64, event: FlowEvent },
    Completed { flow_id: u64, result: SubmissionResult },
    Failed { flow_id: u64, code: String, message: String },
    Cancelled { flow_id: u64 },
}

impl SessionState {
    pub fn flow_id(&self) -> Option<u64> {
        match self {
            SessionState::Idle => None,
            SessionState::InProgress { flow_id, .. }
            | SessionState::Completed { flow_id, .. }
            | SessionState::Failed { flow_id, .. }
            | SessionState::Cancelled { flow_id } => Some(*flow_id),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed { .. }
                | SessionState::Failed { .. }
                | SessionState::Cancelled { .. }
        )
    }
}

#[derive(Default)]
struct SessionInner {
    next_id: u64,
    active: Option<(u64, CancellationToken)>,
}

#[derive(Clone)]
struct Publisher {
    inner: Arc<Mutex<SessionInner>>,
    state_tx: Arc<watch::Sender<SessionState>>,
}

impl Publisher {
    /// Publish `state` if `flow_id` is still the active flow
    fn publish(&self, flow_id: u64, state: SessionState) -> bool {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let current = matches!(inner.active, Some((id, _)) if id == flow_id);
        if current {
            self.state_tx.send_replace(state);
        }
        current
    }

    /// Publish a terminal state and release the active slot
    fn finish(&self, flow_id: u64, state: SessionState) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if matches!(inner.active, Some((id, _)) if id == flow_id) {
            inner.active = None;
            self.state_tx.send_replace(state);
        }
    }
}

pub struct SubmissionSession {
    service: Arc<SubmissionService>,
    publisher: Publisher,
    cooldown_tx: Arc<watch::Sender<CooldownState>>,
    countdown: Arc<Mutex<Option<ScheduledTask>>>,
    root: CancellationToken,
}

impl SubmissionSession {
    pub fn new(service: Arc<SubmissionService>) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        let (cooldown_tx, _) = watch::channel(CooldownState::ready());
        Self {
            service,
            publisher: Publisher {
                inner: Arc::new(Mutex::new(SessionInner::default())),
                state_tx: Arc::new(state_tx),
            },
            cooldown_tx: Arc::new(cooldown_tx),
            countdown: Arc::new(Mutex::new(None)),
            root: CancellationToken::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.publisher.state_tx.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.publisher.state_tx.borrow().clone()
    }

    pub fn cooldown(&self) -> watch::Receiver<CooldownState> {
        self.cooldown_tx.subscribe()
    }

    /// Start a flow for `file`, cancelling any flow already running
    pub fn start(
        &self,
        file: MediaFile,
        user_id: Uuid,
        format: BattleFormat,
        allow_compression: bool,
    ) -> JoinHandle<Result<SubmissionResult, SubmissionError>> {
        let cancel = self.root.child_token();
        let flow_id = {
            let mut inner = self
                .publisher
                .inner
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            if let Some((previous, token)) = inner.active.take() {
                tracing::info!(flow_id = previous, "Cancelling superseded submission flow");
                token.cancel();
            }
            inner.next_id += 1;
            let flow_id = inner.next_id;
            inner.active = Some((flow_id, cancel.clone()));
            flow_id
        };

        self.publisher.publish(
            flow_id,
            SessionState::InProgress {
                flow_id,
                event: FlowEvent::Selected {
                    file_name: file.name.clone(),
                },
            },
        );

        let publisher = self.publisher.clone();
        let events: EventCallback = {
            let publisher = publisher.clone();
            Arc::new(move |event| {
                publisher.publish(flow_id, SessionState::InProgress { flow_id, event });
            })
        };

        let service = self.service.clone();
        let cooldown_tx = self.cooldown_tx.clone();
        let countdown = self.countdown.clone();
        let root = self.root.clone();

        tokio::spawn(async move {
            let result = service
                .run(file, user_id, format, allow_compression, &events, &cancel)
                .await;

            match &result {
                Ok(outcome) => {
                    publisher.finish(
                        flow_id,
                        SessionState::Completed {
                            flow_id,
                            result: outcome.clone(),
                        },
                    );
                }
                Err(SubmissionError::Cancelled) => {
                    publisher.finish(flow_id, SessionState::Cancelled { flow_id });
                }
                Err(e) => {
                    if let SubmissionError::CooldownActive { state, .. } = e {
                        start_countdown(&cooldown_tx, &countdown, &root, state.clone());
                    }
                    publisher.finish(
                        flow_id,
                        SessionState::Failed {
                            flow_id,
                            code: e.error_code().to_string(),
                            message: e.client_message(),
                        },
                    );
                }
            }
            result
        })
    }

    /// Cancel the running flow, if any
    pub fn cancel(&self) {
        let mut inner = self
            .publisher
            .inner
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if let Some((flow_id, token)) = inner.active.take() {
            token.cancel();
            self.publisher
                .state_tx
                .send_replace(SessionState::Cancelled { flow_id });
        }
    }

    /// Fetch the cooldown from the backend and restart the local countdown
    pub async fn refresh_cooldown(&self, user_id: Uuid) -> Result<CooldownState, SubmissionError> {
        let state = self.service.cooldown_status(user_id).await?;
        start_countdown(&self.cooldown_tx, &self.countdown, &self.root, state.clone());
        Ok(state)
    }
}

impl Drop for SubmissionSession {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

/// Publish `state` and tick it down once a minute until submitting is allowed
fn start_countdown(
    cooldown_tx: &Arc<watch::Sender<CooldownState>>,
    countdown: &Arc<Mutex<Option<ScheduledTask>>>,
    root: &CancellationToken,
    state: CooldownState,
) {
    let mut slot = countdown.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(previous) = slot.take() {
        previous.cancel();
    }

    let can_submit = state.can_submit;
    cooldown_tx.send_replace(state);
    if can_submit {
        return;
    }

    let tx = cooldown_tx.clone();
    *slot = Some(ScheduledTask::spawn(
        "cooldown-countdown",
        COOLDOWN_TICK,
        root,
        move || {
            let mut ready = false;
            tx.send_modify(|state| ready = state.tick_minute());
            std::future::ready(if ready {
                TickControl::Stop
            } else {
                TickControl::Continue
            })
        },
    ));
}
