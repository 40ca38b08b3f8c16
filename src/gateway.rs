//! Authenticated access to the duel service.
//!
//! Every call made on behalf of the user goes through [`Gateway::request`], which attaches the
//! current access token. When the service answers `401`, the gateway refreshes the tokens once and
//! retries the original request once. Refreshes are serialized: callers that hit `401` with the
//! same stale token while another refresh is in flight reuse its outcome instead of refreshing
//! again.

use std::sync::{Arc, Mutex, PoisonError};

use duel_api::{LoginRequest, RefreshRequest, TokenPair};
use tracing::{debug, info, instrument, warn};

use crate::{
    credentials::CredentialStore,
    error::ClientError,
    transport::{ApiRequest, ApiResponse, Method, Transport},
};

/// What the caller wants to send, before the gateway resolves the URL and the token.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    /// HTTP verb.
    pub method: Method,
    /// Path relative to the base URL, starting with `/`.
    pub path: String,
    /// `Accept` header, if any.
    pub accept: Option<&'static str>,
    /// JSON body, if any.
    pub json: Option<serde_json::Value>,
    /// See [`ApiRequest::streaming`].
    pub streaming: bool,
}

impl RequestOptions {
    /// `GET path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            accept: None,
            json: None,
            streaming: false,
        }
    }

    /// `POST path` with a JSON body.
    pub fn post(path: impl Into<String>, json: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            accept: None,
            json: Some(json),
            streaming: false,
        }
    }

    /// Long-lived request whose body is read incrementally.
    pub fn stream(path: impl Into<String>, accept: &'static str) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            accept: Some(accept),
            json: None,
            streaming: true,
        }
    }
}

/// Authenticated request wrapper. Owns the only write path to the [`CredentialStore`].
pub struct Gateway {
    transport: Arc<dyn Transport>,
    credentials: CredentialStore,
    base_url: String,
    refresh_lock: Mutex<()>,
}

impl Gateway {
    /// Gateway sending to `base_url` through `transport`, with the tokens of `credentials`.
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: CredentialStore,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            credentials,
            base_url: base_url.into(),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Tokens in use.
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Base URL, without trailing `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Logs in and stores the returned tokens.
    ///
    /// # Errors
    /// [`ClientError::Server`] with the status and body of a rejected login.
    #[instrument(skip(self, password))]
    pub fn login(&self, nickname: &str, password: &str) -> Result<(), ClientError> {
        let body = serde_json::to_value(LoginRequest { nickname, password })
            .map_err(ClientError::decode)?;
        let response = self.send_anonymous(RequestOptions::post("/users/login", body))?;
        if !response.is_success() {
            let status = response.status;
            let body = response.text().unwrap_or_default();
            warn!(status, "login rejected");
            return Err(ClientError::Server { status, body });
        }
        let tokens: TokenPair = response.json().map_err(ClientError::decode)?;
        self.credentials
            .set(tokens.access_token, tokens.refresh_token);
        info!("logged in");
        Ok(())
    }

    /// Sends `options` with the current access token.
    ///
    /// On `401` the tokens are refreshed and the request is sent exactly once more. A `401` on the
    /// retry is returned as is. Other statuses are left to the caller.
    ///
    /// # Errors
    /// - [`ClientError::AuthFailed`] when the refresh was rejected or no refresh token is stored.
    ///   Every later call fails the same way until the user logs in again.
    /// - [`ClientError::Request`] when the service could not be reached.
    #[instrument(skip(self, options), fields(method = %options.method, path = %options.path))]
    pub fn request(&self, options: RequestOptions) -> Result<ApiResponse, ClientError> {
        let used_token = self.credentials.get().access_token;
        let response = self.send_with(&options, &used_token)?;
        if !response.is_unauthorized() {
            return Ok(response);
        }

        debug!("access token rejected");
        let fresh_token = self.refresh_after(&used_token).inspect_err(|e| {
            warn!("token refresh failed: {e}");
        })?;
        self.send_with(&options, &fresh_token)
    }

    /// Makes sure the stored access token is newer than `stale`, refreshing it if nobody else
    /// already did. Returns the access token to retry with.
    fn refresh_after(&self, stale: &str) -> Result<String, ClientError> {
        let _guard = self
            .refresh_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let session = self.credentials.get();
        if session.access_token != stale {
            debug!("tokens already refreshed by another caller");
            return Ok(session.access_token);
        }
        if session.refresh_token.is_empty() {
            return Err(ClientError::AuthFailed { status: None });
        }

        let body = serde_json::to_value(RefreshRequest {
            refresh_token: &session.refresh_token,
        })
        .map_err(ClientError::decode)?;
        let response = self.send_anonymous(RequestOptions::post("/users/refresh", body))?;
        if !response.is_success() {
            return Err(ClientError::AuthFailed {
                status: Some(response.status),
            });
        }
        let tokens: TokenPair = response.json().map_err(ClientError::decode)?;
        self.credentials
            .set(tokens.access_token.clone(), tokens.refresh_token);
        info!("tokens refreshed");
        Ok(tokens.access_token)
    }

    fn send_with(&self, options: &RequestOptions, token: &str) -> Result<ApiResponse, ClientError> {
        let bearer = (!token.is_empty()).then(|| token.to_owned());
        self.transport
            .send(&self.resolve(options, bearer))
            .map_err(ClientError::request)
    }

    fn send_anonymous(&self, options: RequestOptions) -> Result<ApiResponse, ClientError> {
        self.transport
            .send(&self.resolve(&options, None))
            .map_err(ClientError::request)
    }

    fn resolve(&self, options: &RequestOptions, bearer: Option<String>) -> ApiRequest {
        ApiRequest {
            method: options.method,
            url: format!("{}{}", self.base_url, options.path),
            bearer,
            accept: options.accept,
            json: options.json.clone(),
            streaming: options.streaming,
        }
    }
}
