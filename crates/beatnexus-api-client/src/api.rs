//! Domain calls for the submission pipeline.

use crate::types::{
    CooldownStatusParams, CooldownStatusResponse, CreateSubmissionParams,
    CreateSubmissionResponse, MatchmakingOutcome, MatchmakingRequest, OneOrRows,
    SubmissionCreateResult,
};
use crate::{ApiClient, ApiError, ApiResult};
use async_trait::async_trait;
use beatnexus_core::constants::{
    RPC_COOLDOWN_STATUS, RPC_CREATE_SUBMISSION, SUBMISSION_WEBHOOK_FUNCTION,
};
use beatnexus_core::{CooldownState, SubmissionRequest};
use uuid::Uuid;

pub fn rpc_path(function: &str) -> String {
    format!("/rest/v1/rpc/{}", function)
}

pub fn function_path(function: &str) -> String {
    format!("/functions/v1/{}", function)
}

/// Server side of a submission: record creation, cooldown and matchmaking
#[async_trait]
pub trait SubmissionBackend: Send + Sync {
    async fn create_submission(
        &self,
        request: &SubmissionRequest,
    ) -> ApiResult<SubmissionCreateResult>;

    async fn cooldown_status(&self, user_id: Uuid) -> ApiResult<CooldownState>;

    async fn trigger_matchmaking(&self, submission_id: Uuid) -> ApiResult<MatchmakingOutcome>;
}

#[async_trait]
impl SubmissionBackend for ApiClient {
    #[tracing::instrument(skip(self, request), fields(
        rpc = RPC_CREATE_SUBMISSION,
        battle_format = %request.battle_format()
    ))]
    async fn create_submission(
        &self,
        request: &SubmissionRequest,
    ) -> ApiResult<SubmissionCreateResult> {
        let params = CreateSubmissionParams {
            p_user_id: request.owner_id(),
            p_video_url: request.video_url(),
            p_battle_format: request.battle_format().as_str(),
        };

        let response: CreateSubmissionResponse = self
            .post_json(&rpc_path(RPC_CREATE_SUBMISSION), &params)
            .await?;

        let result = SubmissionCreateResult::from(response);
        tracing::info!(result = ?result, "Submission creation procedure returned");
        Ok(result)
    }

    #[tracing::instrument(skip(self), fields(rpc = RPC_COOLDOWN_STATUS))]
    async fn cooldown_status(&self, user_id: Uuid) -> ApiResult<CooldownState> {
        let rows: OneOrRows<CooldownStatusResponse> = self
            .post_json(
                &rpc_path(RPC_COOLDOWN_STATUS),
                &CooldownStatusParams { p_user_id: user_id },
            )
            .await?;

        rows.into_first()
            .map(CooldownState::from)
            .ok_or_else(|| ApiError::UnexpectedResponse("empty cooldown status".to_string()))
    }

    #[tracing::instrument(skip(self), fields(function = SUBMISSION_WEBHOOK_FUNCTION))]
    async fn trigger_matchmaking(&self, submission_id: Uuid) -> ApiResult<MatchmakingOutcome> {
        let body = self
            .post_json_text(
                &function_path(SUBMISSION_WEBHOOK_FUNCTION),
                &MatchmakingRequest { submission_id },
            )
            .await?;

        let outcome = MatchmakingOutcome::decode(&body)?;
        tracing::info!(outcome = ?outcome, "Matchmaking webhook returned");
        Ok(outcome)
    }
}
