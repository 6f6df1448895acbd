//! Throttled relay of compression progress to flow observers.
//!
//! The compressor writes every report it produces into a single slot; a
//! [`ScheduledTask`] polls the slot and forwards only changed values, and
//! `finish` flushes the last report once the pass has ended.

use crate::events::{EventCallback, FlowEvent};
use beatnexus_core::CompressionProgress;
use beatnexus_infra::{ScheduledTask, TickControl};
use beatnexus_processing::ProgressCallback;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct RelayState {
    latest: Mutex<Option<CompressionProgress>>,
    last_sent: Mutex<Option<CompressionProgress>>,
    sink: EventCallback,
}

impl RelayState {
    fn flush(&self) {
        let latest = self
            .latest
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let Some(latest) = latest else { return };

        let mut last_sent = self.last_sent.lock().unwrap_or_else(|e| e.into_inner());
        if last_sent.as_ref() != Some(&latest) {
            *last_sent = Some(latest.clone());
            drop(last_sent);
            (self.sink)(FlowEvent::Compressing(latest));
        }
    }
}

pub(crate) struct ProgressRelay {
    state: Arc<RelayState>,
    task: ScheduledTask,
}

impl ProgressRelay {
    pub(crate) fn start(period: Duration, cancel: &CancellationToken, sink: EventCallback) -> Self {
        let state = Arc::new(RelayState {
            latest: Mutex::new(None),
            last_sent: Mutex::new(None),
            sink,
        });

        let polled = state.clone();
        let task = ScheduledTask::spawn("compression-progress", period, cancel, move || {
            polled.flush();
            std::future::ready(TickControl::Continue)
        });

        Self { state, task }
    }

    /// Callback handed to the compressor
    pub(crate) fn callback(&self) -> ProgressCallback {
        let state = self.state.clone();
        Arc::new(move |progress| {
            *state.latest.lock().unwrap_or_else(|e| e.into_inner()) = Some(progress);
        })
    }

    pub(crate) async fn finish(self) {
        self.task.stop().await;
        self.state.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (EventCallback, Arc<Mutex<Vec<FlowEvent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: EventCallback = Arc::new(move |event| sink.lock().unwrap().push(event));
        (callback, seen)
    }

    #[tokio::test]
    async fn test_finish_flushes_last_report_once() {
        let (sink, seen) = recorder();
        let relay = ProgressRelay::start(Duration::from_secs(60), &CancellationToken::new(), sink);
        let callback = relay.callback();

        callback(CompressionProgress::stage(10, "Preparing compression..."));
        callback(CompressionProgress::stage(100, "Complete"));
        relay.finish().await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0],
            FlowEvent::Compressing(CompressionProgress::stage(100, "Complete"))
        );
    }

    #[tokio::test]
    async fn test_polling_forwards_changes_only() {
        let (sink, seen) = recorder();
        let relay = ProgressRelay::start(Duration::from_millis(5), &CancellationToken::new(), sink);
        let callback = relay.callback();

        callback(CompressionProgress::stage(20, "Starting compression..."));
        tokio::time::sleep(Duration::from_millis(40)).await;
        relay.finish().await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
    }
}
