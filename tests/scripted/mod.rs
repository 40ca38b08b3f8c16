//! In-memory duel service used by the integration tests.

#![allow(dead_code)]

use std::{
    collections::VecDeque,
    io::{BufReader, Read},
    path::PathBuf,
    sync::{
        mpsc::{self, Receiver, Sender},
        Arc, Mutex,
    },
    thread,
    time::{Duration, Instant},
};

use duel_client::{
    configuration::Configuration,
    transport::{ApiRequest, ApiResponse, Method, Transport},
};
use serde_json::Value;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

pub const BASE: &str = "http://duel.test/api";

enum Body {
    Text(String),
    Stream(Receiver<String>),
}

struct Reply {
    status: u16,
    body: Body,
}

struct Route {
    method: Method,
    url: String,
    bearer: Option<String>,
    replies: VecDeque<Reply>,
}

/// Answers requests from scripted routes, in insertion order.
///
/// The last reply of a route is reused once the others are consumed. Unknown routes get `404`.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        init_test_logger();
        Arc::new(Self::default())
    }

    pub fn on(&self, method: Method, path: &str, status: u16, body: &str) -> &Self {
        self.push(method, path, None, status, Body::Text(body.to_owned()));
        self
    }

    pub fn on_json(&self, method: Method, path: &str, status: u16, body: Value) -> &Self {
        self.on(method, path, status, &body.to_string())
    }

    /// Like [`on_json`](Self::on_json), only for requests carrying `token`.
    pub fn on_json_with_token(
        &self,
        method: Method,
        path: &str,
        token: &str,
        status: u16,
        body: Value,
    ) -> &Self {
        self.push(
            method,
            path,
            Some(token.to_owned()),
            status,
            Body::Text(body.to_string()),
        );
        self
    }

    /// Event stream answered with `200`. Lines are pushed through the returned feed; dropping
    /// it closes the stream.
    pub fn on_stream(&self, path: &str) -> StreamFeed {
        let (tx, rx) = mpsc::channel();
        self.push(Method::Get, path, None, 200, Body::Stream(rx));
        StreamFeed { tx }
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        let url = format!("{BASE}{path}");
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }

    fn push(&self, method: Method, path: &str, bearer: Option<String>, status: u16, body: Body) {
        let url = format!("{BASE}{path}");
        let mut routes = self.routes.lock().unwrap();
        let reply = Reply { status, body };
        match routes
            .iter_mut()
            .find(|r| r.method == method && r.url == url && r.bearer == bearer)
        {
            Some(route) => route.replies.push_back(reply),
            None => routes.push(Route {
                method,
                url,
                bearer,
                replies: VecDeque::from([reply]),
            }),
        }
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &ApiRequest) -> anyhow::Result<ApiResponse> {
        self.requests.lock().unwrap().push(request.clone());

        let mut routes = self.routes.lock().unwrap();
        let route = routes.iter_mut().find(|r| {
            r.method == request.method
                && r.url == request.url
                && (r.bearer.is_none() || r.bearer == request.bearer)
        });
        let Some(route) = route else {
            return Ok(ApiResponse::new(404, std::io::empty()));
        };

        // the last text reply is reused, a stream can only be opened once
        let reply = match (route.replies.len(), route.replies.front()) {
            (
                1,
                Some(Reply {
                    status,
                    body: Body::Text(text),
                }),
            ) => Reply {
                status: *status,
                body: Body::Text(text.clone()),
            },
            _ => route
                .replies
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("no reply left for {}", request.url))?,
        };

        Ok(match reply.body {
            Body::Text(text) => ApiResponse::new(reply.status, std::io::Cursor::new(text.into_bytes())),
            Body::Stream(rx) => ApiResponse::new(reply.status, ChannelReader::new(rx)),
        })
    }
}

/// Write side of a scripted event stream.
pub struct StreamFeed {
    tx: Sender<String>,
}

impl StreamFeed {
    pub fn line(&self, line: &str) {
        let _ = self.tx.send(format!("{line}\n"));
    }

    pub fn event(&self, event_type: &str, data: Value) {
        self.line(&format!("event: {event_type}"));
        self.line(&format!("data: {data}"));
        self.line("");
    }

    pub fn keep_alive(&self) {
        self.line(":");
    }
}

/// Blocking reader fed by a channel, at end of file once the sender is dropped.
pub struct ChannelReader {
    rx: Receiver<String>,
    current: Vec<u8>,
    pos: usize,
}

impl ChannelReader {
    fn new(rx: Receiver<String>) -> Self {
        Self {
            rx,
            current: vec![],
            pos: 0,
        }
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        while self.pos >= self.current.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.current = chunk.into_bytes();
                    self.pos = 0;
                }
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.current.len() - self.pos);
        buf[..n].copy_from_slice(&self.current[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Sends the client logs to the captured test output, so they show up for failing tests.
fn init_test_logger() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_ansi(false)
        .with_thread_names(true)
        .with_test_writer()
        .finish();

    // already installed by another test of the same binary
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Keyboard of a scripted user: lines sent through the feed, end of input once it is dropped.
pub fn keyboard() -> (StreamFeed, BufReader<ChannelReader>) {
    let (tx, rx) = mpsc::channel();
    (StreamFeed { tx }, BufReader::new(ChannelReader::new(rx)))
}

pub fn fast_config() -> Configuration {
    Configuration::new()
        .with_base_url(BASE)
        .with_poll_interval(Duration::from_millis(10))
        .with_finish_grace(Duration::ZERO)
        .with_join_timeout(Duration::from_secs(2))
}

/// Polls `condition` until it holds, for at most five seconds.
pub fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(5));
    }
}

/// Writes `content` to a file unique to this test process.
pub fn solution_file(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("duel-client-{}-{name}", std::process::id()));
    std::fs::write(&path, content).unwrap();
    path
}
