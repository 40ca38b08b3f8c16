//! Raw HTTP exchange with the duel service.
//!
//! [`Transport`] is the only place where bytes leave the process. Everything above it (token
//! handling, endpoint wrappers, the event stream) is written against the trait, so it can run
//! against [`HttpTransport`] or an in-memory script.

use std::{fmt, io::Read, time::Duration};

use anyhow::Context;
use serde::de::DeserializeOwned;
use tracing::{instrument, trace};

/// HTTP verb of an [`ApiRequest`]. The service only needs these two.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// A fully resolved request, ready to be sent.
#[derive(Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP verb.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Access token for the `Authorization` header. Hidden from `Debug`.
    pub bearer: Option<String>,
    /// `Accept` header, if any.
    pub accept: Option<&'static str>,
    /// JSON body, if any.
    pub json: Option<serde_json::Value>,
    /// Long-lived response read incrementally: no overall timeout applies.
    pub streaming: bool,
}

impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("bearer", &self.bearer.as_ref().map(|_| "***"))
            .field("accept", &self.accept)
            .field("streaming", &self.streaming)
            .finish()
    }
}

/// Status and unread body of a response.
///
/// The body is a reader so that the event stream can be consumed line by line while the
/// connection is still open.
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    body: Box<dyn Read + Send>,
}

impl ApiResponse {
    /// Response with `status` whose body is read from `body`.
    pub fn new(status: u16, body: impl Read + Send + 'static) -> Self {
        Self {
            status,
            body: Box::new(body),
        }
    }

    /// Only `200` is a success for the duel service.
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// `401`: the access token was refused.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Reads the whole body as UTF-8 text.
    pub fn text(mut self) -> anyhow::Result<String> {
        let mut text = String::new();
        self.body
            .read_to_string(&mut text)
            .context("could not read response body")?;
        Ok(text)
    }

    /// Reads the whole body and decodes it as JSON.
    pub fn json<T: DeserializeOwned>(self) -> anyhow::Result<T> {
        let text = self.text()?;
        serde_json::from_str(&text).with_context(|| format!("invalid JSON body: '{text}'"))
    }

    /// Unread body, for incremental reads.
    pub fn into_reader(self) -> Box<dyn Read + Send> {
        self.body
    }
}

impl fmt::Debug for ApiResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Sends one request and returns the response, whatever its status.
///
/// An `Err` means the service could not be reached at all.
pub trait Transport: Send + Sync {
    /// Sends `request` and waits for the response head. The body is not read yet.
    fn send(&self, request: &ApiRequest) -> anyhow::Result<ApiResponse>;
}

/// [`Transport`] over a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    request_timeout: Duration,
}

impl HttpTransport {
    /// Client whose regular requests time out after `request_timeout`.
    pub fn new(request_timeout: Duration) -> anyhow::Result<Self> {
        // no client-wide timeout, the event stream stays open for the whole duel
        let client = reqwest::blocking::Client::builder()
            .timeout(None)
            .build()
            .context("could not build HTTP client")?;
        Ok(Self {
            client,
            request_timeout,
        })
    }
}

impl Transport for HttpTransport {
    #[instrument(skip(self), fields(method = %request.method, url = %request.url))]
    fn send(&self, request: &ApiRequest) -> anyhow::Result<ApiResponse> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(accept) = request.accept {
            builder = builder.header(reqwest::header::ACCEPT, accept);
        }
        if let Some(json) = &request.json {
            builder = builder.json(json);
        }
        if !request.streaming {
            builder = builder.timeout(self.request_timeout);
        }

        let response = builder
            .send()
            .with_context(|| format!("{} {} failed", request.method, request.url))?;
        let status = response.status().as_u16();
        trace!(status);
        Ok(ApiResponse::new(status, response))
    }
}
