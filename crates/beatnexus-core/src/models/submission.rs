use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::battle::BattleFormat;
use crate::validation::ValidatedVideo;

/// Payload for the create-submission procedure.
///
/// Only constructible from a [`ValidatedVideo`], so an oversized or
/// out-of-range video can never reach the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionRequest {
    owner_id: Uuid,
    video_url: String,
    battle_format: BattleFormat,
}

impl SubmissionRequest {
    pub fn new(owner_id: Uuid, video: &ValidatedVideo, video_url: impl Into<String>) -> Self {
        Self {
            owner_id,
            video_url: video_url.into(),
            battle_format: video.format(),
        }
    }

    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    pub fn video_url(&self) -> &str {
        &self.video_url
    }

    pub fn battle_format(&self) -> BattleFormat {
        self.battle_format
    }
}

/// Final outcome of a successful submission flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionResult {
    BattleCreated {
        submission_id: Uuid,
        #[serde(skip_serializing_if = "Option::is_none")]
        battle_id: Option<Uuid>,
        message: String,
    },
    WaitingForOpponent {
        submission_id: Uuid,
        message: String,
    },
}

impl SubmissionResult {
    pub fn submission_id(&self) -> Uuid {
        match self {
            SubmissionResult::BattleCreated { submission_id, .. }
            | SubmissionResult::WaitingForOpponent { submission_id, .. } => *submission_id,
        }
    }

    pub fn is_waiting(&self) -> bool {
        matches!(self, SubmissionResult::WaitingForOpponent { .. })
    }
}
