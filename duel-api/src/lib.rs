//! Request and response bodies of the duel service, as seen by the client.
//!
//! Nothing here performs I/O. Field names follow the JSON contract of the service.

use serde::{Deserialize, Serialize};

mod event;

pub use event::{DuelFinished, DuelStarted, StreamEvent};

pub type DuelId = i64;
pub type UserId = i64;
pub type SubmissionId = i64;

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub nickname: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Returned by both login and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Outcome of a duel from the point of view of the requesting user.
///
/// Anything the server sends besides `Win`, `Lose` and `Draw` (including no value at all) is read
/// as `Pending`.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default, Deserialize)]
pub enum DuelResult {
    Win,
    Lose,
    Draw,
    // must stay last for `serde(other)`
    #[default]
    #[serde(other)]
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DuelInfo {
    pub id: DuelId,
    pub task_id: String,
    pub opponent_id: UserId,
    #[serde(default)]
    pub result: DuelResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserInfo {
    pub nickname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskBundle {
    pub task: Task,
}

/// Read-only snapshot of a duel task. File fields are paths relative to the task, fetched
/// separately.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Task {
    pub title: String,
    /// milliseconds
    #[serde(rename = "tl")]
    pub time_limit: u64,
    /// megabytes
    #[serde(rename = "ml")]
    pub memory_limit: u64,
    #[serde(rename = "statement")]
    pub statement_ref: String,
    #[serde(default)]
    pub tests: Vec<TestCase>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestCase {
    pub order: u32,
    #[serde(rename = "input")]
    pub input_ref: String,
    #[serde(rename = "output")]
    pub output_ref: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionRequest<'a> {
    pub solution: &'a str,
    pub language: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SubmissionCreated {
    pub submission_id: SubmissionId,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, Default, Deserialize)]
pub enum SubmissionStatus {
    Running,
    Done,
    #[default]
    #[serde(other)]
    Pending,
}

/// Server view of one submission while it is being graded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubmissionView {
    #[serde(default)]
    pub status: SubmissionStatus,
    #[serde(default)]
    pub verdict: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl SubmissionView {
    pub fn is_done(&self) -> bool {
        self.status == SubmissionStatus::Done
    }
}
