//! Wire shapes of the backend calls and their decoded forms.

use beatnexus_core::constants::COOLDOWN_ACTIVE_ERROR;
use beatnexus_core::CooldownState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ApiError;

#[derive(Debug, Serialize)]
pub struct CreateSubmissionParams<'a> {
    pub p_user_id: Uuid,
    pub p_video_url: &'a str,
    pub p_battle_format: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CooldownStatusParams {
    pub p_user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct MatchmakingRequest {
    pub submission_id: Uuid,
}

/// Raw reply of `create_submission_with_cooldown_check`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateSubmissionResponse {
    #[serde(default)]
    pub success: bool,
    pub submission_id: Option<Uuid>,
    pub error: Option<String>,
    pub message: Option<String>,
    pub remaining_minutes: Option<u32>,
}

/// Decoded result of the submission-creation procedure
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionCreateResult {
    Created(Uuid),
    CooldownActive {
        remaining_minutes: u32,
        message: String,
    },
    Failure {
        reason: String,
    },
}

impl From<CreateSubmissionResponse> for SubmissionCreateResult {
    fn from(response: CreateSubmissionResponse) -> Self {
        if response.error.as_deref() == Some(COOLDOWN_ACTIVE_ERROR) {
            let remaining_minutes = response.remaining_minutes.unwrap_or(0);
            let message = response
                .message
                .unwrap_or_else(|| CooldownState::active(remaining_minutes).message());
            return SubmissionCreateResult::CooldownActive {
                remaining_minutes,
                message,
            };
        }

        match (response.success, response.submission_id) {
            (true, Some(id)) => SubmissionCreateResult::Created(id),
            (true, None) => SubmissionCreateResult::Failure {
                reason: "Submission created without an id".to_string(),
            },
            (false, _) => SubmissionCreateResult::Failure {
                reason: response
                    .message
                    .or(response.error)
                    .unwrap_or_else(|| "Submission failed".to_string()),
            },
        }
    }
}

/// Raw reply of `get_submission_cooldown_status`
#[derive(Debug, Clone, Deserialize)]
pub struct CooldownStatusResponse {
    pub can_submit: bool,
    #[serde(default)]
    pub remaining_minutes: u32,
    pub last_submission_at: Option<DateTime<Utc>>,
}

impl From<CooldownStatusResponse> for CooldownState {
    fn from(response: CooldownStatusResponse) -> Self {
        CooldownState {
            can_submit: response.can_submit,
            remaining_minutes: if response.can_submit {
                0
            } else {
                response.remaining_minutes
            },
            last_submission_at: response.last_submission_at,
        }
    }
}

/// Table-returning procedures reply with a one-row array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrRows<T> {
    One(T),
    Rows(Vec<T>),
}

impl<T> OneOrRows<T> {
    pub(crate) fn into_first(self) -> Option<T> {
        match self {
            OneOrRows::One(value) => Some(value),
            OneOrRows::Rows(rows) => rows.into_iter().next(),
        }
    }
}

/// Raw reply of the matchmaking webhook
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchmakingResponse {
    pub success: Option<bool>,
    pub message: Option<String>,
    pub battle_id: Option<Uuid>,
    pub error: Option<String>,
}

/// Decoded matchmaking outcome
#[derive(Debug, Clone, PartialEq)]
pub enum MatchmakingOutcome {
    BattleCreated {
        battle_id: Option<Uuid>,
        message: String,
    },
    WaitingForOpponent {
        message: String,
    },
}

impl MatchmakingOutcome {
    /// Classify a 2xx webhook body; any unrecognised shape is an error
    pub fn decode(body: &str) -> Result<Self, ApiError> {
        let response: MatchmakingResponse = serde_json::from_str(body)
            .map_err(|_| ApiError::UnexpectedResponse(body.to_string()))?;

        if response.error.is_some() || response.success == Some(false) {
            return Err(ApiError::UnexpectedResponse(body.to_string()));
        }

        if let Some(battle_id) = response.battle_id {
            return Ok(MatchmakingOutcome::BattleCreated {
                battle_id: Some(battle_id),
                message: response
                    .message
                    .unwrap_or_else(|| "Battle created!".to_string()),
            });
        }

        if let Some(message) = response
            .message
            .as_ref()
            .filter(|m| m.to_lowercase().contains("waiting"))
        {
            return Ok(MatchmakingOutcome::WaitingForOpponent {
                message: message.clone(),
            });
        }

        if response.success == Some(true) {
            return Ok(MatchmakingOutcome::BattleCreated {
                battle_id: None,
                message: response
                    .message
                    .unwrap_or_else(|| "Battle created!".to_string()),
            });
        }

        Err(ApiError::UnexpectedResponse(body.to_string()))
    }
}
