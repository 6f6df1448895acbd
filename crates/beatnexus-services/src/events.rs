use beatnexus_core::CompressionProgress;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Milestones of one submission flow, in the order they occur
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FlowEvent {
    Selected { file_name: String },
    Probing,
    Validated { duration_seconds: f64, size_mb: f64 },
    CompressionOffered { message: String },
    Compressing(CompressionProgress),
    CompressionPassFinished { pass: u32, size_mb: f64 },
    Uploading { size_mb: f64 },
    CreatingSubmission,
    Matchmaking { submission_id: Uuid },
}

pub type EventCallback = Arc<dyn Fn(FlowEvent) + Send + Sync>;

/// Callback that drops every event
pub fn ignore_events() -> EventCallback {
    Arc::new(|_| {})
}
