//! Typed endpoints of the duel service, on top of the [`Gateway`].
//!
//! Any status other than `200` becomes [`ClientError::Server`], carrying the response body.

use std::sync::Arc;

use duel_api::{
    DuelId, DuelInfo, SubmissionCreated, SubmissionId, SubmissionRequest, SubmissionView,
    TaskBundle, UserId, UserInfo,
};
use serde::de::DeserializeOwned;

use crate::{
    error::ClientError,
    gateway::{Gateway, RequestOptions},
    language::Language,
    transport::ApiResponse,
};

/// `Accept` header of the duel event stream.
pub const EVENT_STREAM: &str = "text/event-stream";

/// Cheap to clone, every clone shares the same gateway (and tokens).
#[derive(Clone)]
pub struct DuelApi {
    gateway: Arc<Gateway>,
}

impl DuelApi {
    /// Endpoints reached through `gateway`.
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// Opens the duel event stream. The response is returned whatever its status so that the
    /// listener can report it.
    pub fn connect(&self) -> Result<ApiResponse, ClientError> {
        self.gateway
            .request(RequestOptions::stream("/duels/connect", EVENT_STREAM))
    }

    /// Participants, task and (once finished) result of a duel.
    pub fn duel_info(&self, duel_id: DuelId) -> Result<DuelInfo, ClientError> {
        self.get_json(format!("/duels/{duel_id}"))
    }

    /// Public profile of a user.
    pub fn user_info(&self, user_id: UserId) -> Result<UserInfo, ClientError> {
        self.get_json(format!("/users/{user_id}"))
    }

    /// Task description. Statement and tests are file references, see [`Self::task_file`].
    pub fn task(&self, task_id: &str) -> Result<TaskBundle, ClientError> {
        self.get_json(format!("/task/{task_id}"))
    }

    /// Raw content of a task file (statement, test input or output).
    pub fn task_file(&self, task_id: &str, file: &str) -> Result<String, ClientError> {
        let response = self
            .gateway
            .request(RequestOptions::get(format!("/task/{task_id}/{file}")))?;
        let response = check_status(response)?;
        response.text().map_err(ClientError::decode)
    }

    /// Sends a solution for `duel_id` and returns the id given to the submission.
    pub fn submit(
        &self,
        duel_id: DuelId,
        solution: &str,
        language: Language,
    ) -> Result<SubmissionId, ClientError> {
        let body = serde_json::to_value(SubmissionRequest {
            solution,
            language: language.as_str(),
        })
        .map_err(ClientError::decode)?;
        let response = self.gateway.request(RequestOptions::post(
            format!("/duels/{duel_id}/submissions"),
            body,
        ))?;
        let created: SubmissionCreated = check_status(response)?
            .json()
            .map_err(ClientError::decode)?;
        Ok(created.submission_id)
    }

    /// Current grading status of a submission.
    pub fn submission(
        &self,
        duel_id: DuelId,
        submission_id: SubmissionId,
    ) -> Result<SubmissionView, ClientError> {
        self.get_json(format!("/duels/{duel_id}/submissions/{submission_id}"))
    }

    fn get_json<T: DeserializeOwned>(&self, path: String) -> Result<T, ClientError> {
        let response = self.gateway.request(RequestOptions::get(path))?;
        check_status(response)?
            .json()
            .map_err(ClientError::decode)
    }
}

fn check_status(response: ApiResponse) -> Result<ApiResponse, ClientError> {
    if response.is_success() {
        return Ok(response);
    }
    let status = response.status;
    let body = response.text().unwrap_or_default();
    Err(ClientError::Server { status, body })
}
