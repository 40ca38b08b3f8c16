//! Interactive command loop.
//!
//! Lines are read on a dedicated thread and forwarded to the loop through a channel, next to the
//! end-of-session notification of the controller. The loop therefore returns as soon as the duel
//! is over, even while the reader thread is blocked on input.

use std::{
    io::BufRead,
    sync::{mpsc, Arc},
    thread,
};

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::{
    console::Console,
    controller::{DuelController, SessionEnd},
    error::ClientError,
};

/// A parsed input line.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    /// `submit <path>`, the path being everything after the first space.
    Submit(String),
    /// `submit` without a path.
    Usage,
    /// Blank line.
    Empty,
    /// Anything else, as typed.
    Unknown(String),
}

/// Parses one input line. Never fails: unknown input is a [`Command::Unknown`].
pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    if line == "submit" {
        return Command::Usage;
    }
    match line.strip_prefix("submit ") {
        Some(path) if !path.trim().is_empty() => Command::Submit(path.trim().to_owned()),
        Some(_) => Command::Usage,
        None => Command::Unknown(line.to_owned()),
    }
}

enum Input {
    Line(String),
    Closed,
    Ended(SessionEnd),
}

/// How [`run`] returned.
#[derive(Debug, PartialEq, Eq)]
pub enum Exit {
    /// The duel finished and every poller was joined.
    DuelOver(SessionEnd),
    /// Input was closed by the user.
    InputClosed,
}

/// Reads commands from `input` until the duel ends or the input is closed.
///
/// On closed input the controller is told to [`leave`](DuelController::leave) before returning.
///
/// # Errors
/// The input reader thread could not be started.
pub fn run(
    controller: &Arc<DuelController>,
    console: Arc<dyn Console>,
    input: impl BufRead + Send + 'static,
) -> anyhow::Result<Exit> {
    let (tx, rx) = mpsc::channel();

    let end_tx = tx.clone();
    controller.on_end(move |end| {
        let _ = end_tx.send(Input::Ended(end));
    });

    thread::Builder::new()
        .name("input".to_owned())
        .spawn(move || read_lines(input, tx))
        .context("could not start input reader")?;

    console.prompt();
    // the controller keeps a sender alive, so `recv` only fails if it is gone
    while let Ok(received) = rx.recv() {
        match received {
            Input::Line(line) => {
                execute(controller, &*console, parse_command(&line));
                console.prompt();
            }
            Input::Closed => {
                info!("input closed");
                console.say("\nLeaving...");
                let detached = controller.leave();
                if detached > 0 {
                    warn!(detached, "pollers still running at exit");
                }
                return Ok(Exit::InputClosed);
            }
            Input::Ended(end) => return Ok(Exit::DuelOver(end)),
        }
    }
    Ok(Exit::InputClosed)
}

fn read_lines(input: impl BufRead, tx: mpsc::Sender<Input>) {
    for line in input.lines() {
        let Ok(line) = line else {
            break;
        };
        if tx.send(Input::Line(line)).is_err() {
            // loop already returned
            return;
        }
    }
    let _ = tx.send(Input::Closed);
}

fn execute(controller: &DuelController, console: &dyn Console, command: Command) {
    debug!(?command);
    match command {
        Command::Empty => {}
        Command::Usage => console.say("Usage: submit <path_to_file>"),
        Command::Unknown(_) => console.say("Unknown command. Available commands: submit"),
        Command::Submit(path) => {
            if let Err(e) = controller.submit(&path) {
                console.say(&describe_submit_error(&e));
            }
        }
    }
}

fn describe_submit_error(e: &ClientError) -> String {
    match e {
        ClientError::Validation(v) => format!("Cannot submit: {v}"),
        ClientError::Server { status, body } => {
            format!("Submission rejected: {status} - {body}")
        }
        other => format!("Submission failed: {other}"),
    }
}
