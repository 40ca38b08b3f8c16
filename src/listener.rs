//! Event stream listener.
//!
//! Opens the duel event stream and reads it line by line on its own thread. Complete events
//! are handed to an [`EventHandler`] on that same thread, one at a time and in arrival order.
//! The listener never reconnects: when the stream fails or closes, it reports it and returns.

use std::{
    io::{BufRead, BufReader},
    sync::Arc,
    thread::{self, JoinHandle},
};

use anyhow::Context;
use duel_api::StreamEvent;
use tracing::{debug, error, info, instrument};

use crate::{
    api::DuelApi,
    console::Console,
    error::ClientError,
    shutdown::ShutdownSignal,
    stream::{EventParser, Frame},
};

/// Whether the listener should keep reading after an event.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Flow {
    Continue,
    Stop,
}

/// Receiver of decoded stream events.
pub trait EventHandler: Send + Sync {
    fn handle_event(&self, event: StreamEvent) -> Flow;
}

/// Why [`listen`] returned without error.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ListenerExit {
    /// The server closed the stream.
    Closed,
    /// The handler asked to stop, or the shutdown signal was raised.
    Stopped,
}

/// Runs [`listen`] on a new thread and reports its failure on `console`.
pub fn spawn_listener(
    api: DuelApi,
    handler: Arc<dyn EventHandler>,
    console: Arc<dyn Console>,
    shutdown: ShutdownSignal,
) -> anyhow::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("event-stream".to_owned())
        .spawn(move || match listen(&api, &*handler, &shutdown) {
            Ok(ListenerExit::Stopped) => {}
            Ok(ListenerExit::Closed) => console.notify("The server closed the event stream."),
            Err(e) => {
                error!("listener ended: {e}");
                console.notify(&format!("Connection error: {e}"));
            }
        })
        .context("could not start event stream listener")
}

/// Connects to the event stream and dispatches events until the stream ends.
///
/// The shutdown signal is checked before each line is read: a listener blocked on a read
/// notices it once the next line arrives.
///
/// # Errors
/// - [`ClientError::ConnectionLost`] when the connection fails, is refused, or breaks.
/// - [`ClientError::Decode`] when a known event carries an invalid payload. The listener does
///   not try to resynchronize.
#[instrument(skip_all)]
pub fn listen(
    api: &DuelApi,
    handler: &dyn EventHandler,
    shutdown: &ShutdownSignal,
) -> Result<ListenerExit, ClientError> {
    let response = api.connect().map_err(|e| match e {
        ClientError::Request(msg) => ClientError::ConnectionLost(msg),
        other => other,
    })?;
    if !response.is_success() {
        return Err(ClientError::ConnectionLost(format!(
            "server answered {}",
            response.status
        )));
    }
    info!("connected to event stream");

    let mut reader = BufReader::new(response.into_reader());
    let mut parser = EventParser::new();
    let mut line = String::new();
    loop {
        if shutdown.is_raised() {
            debug!("stopped by shutdown");
            return Ok(ListenerExit::Stopped);
        }

        line.clear();
        let n = reader
            .read_line(&mut line)
            .map_err(|e| ClientError::ConnectionLost(e.to_string()))?;
        if n == 0 {
            info!("event stream closed");
            return Ok(ListenerExit::Closed);
        }

        match parser.feed(&line).map_err(ClientError::decode)? {
            Frame::Skip => {}
            Frame::Ignored(event_type) => debug!(%event_type, "ignoring unknown event"),
            Frame::Event(event) => {
                debug!(duel_id = event.duel_id(), "dispatching");
                if handler.handle_event(event) == Flow::Stop {
                    return Ok(ListenerExit::Stopped);
                }
            }
        }
    }
}
