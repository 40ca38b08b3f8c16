//! Errors surfaced to the user by client operations.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while talking to the duel service.
///
/// None of these are fatal for the process: they are reported to the user and the operation that
/// produced them is abandoned.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The refresh token was rejected, or there was none to use. Calls keep failing until the
    /// user logs in again.
    #[error("authentication failed{}", status_suffix(.status))]
    AuthFailed {
        /// Status of the rejected login/refresh call, if one was made.
        status: Option<u16>,
    },
    /// The event stream could not be opened or broke while reading.
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    /// Refused locally, no request was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The service answered with a non-success status.
    #[error("server error {status}: {body}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },
    /// The request did not reach the service (DNS, TCP, TLS, timeout).
    #[error("request failed: {0}")]
    Request(String),
    /// The response body was not what the endpoint promises.
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Local refusals, detected before any request is made.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Submissions are only accepted while a duel is running.
    #[error("you are not in an active duel")]
    NotInDuel,
    /// The client is already queued or playing.
    #[error("you are already in a duel or waiting for one")]
    AlreadyConnected,
    /// The solution file does not exist.
    #[error("file {} not found", .0.display())]
    FileNotFound(PathBuf),
    /// The solution file exists but could not be read as text.
    #[error("could not read {}: {reason}", .path.display())]
    UnreadableFile {
        /// Path given by the user.
        path: PathBuf,
        /// Underlying I/O error message.
        reason: String,
    },
    /// The file extension has no language mapping.
    #[error("unsupported file extension '{0}', use one of .py, .cpp, .go")]
    UnknownLanguage(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

impl ClientError {
    /// True if the service refused the credentials, either the refresh itself or a request sent
    /// with freshly refreshed tokens.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            ClientError::AuthFailed { .. } | ClientError::Server { status: 401, .. }
        )
    }

    pub(crate) fn request(err: impl std::fmt::Display) -> Self {
        ClientError::Request(format!("{err:#}"))
    }

    pub(crate) fn decode(err: impl std::fmt::Display) -> Self {
        ClientError::Decode(err.to_string())
    }
}
