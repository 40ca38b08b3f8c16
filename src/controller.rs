//! Duel lifecycle.
//!
//! [`DuelController`] is the only writer of the [`ClientState`]. It reacts to the events read by
//! the listener and to the commands typed by the user:
//!
//! ```text
//! Idle --connect--> Queued --DuelStarted--> Active --DuelFinished(current id)--> Finishing --> Terminal
//! ```
//!
//! - `DuelStarted` records the duel, then fetches and prints the opponent and the task. A failed
//!   fetch is reported but the duel stays active: its id is all a submission needs.
//! - `DuelFinished` for another duel than the current one is dropped.
//! - Finishing waits a short grace period, prints the final result, raises the shutdown signal
//!   and joins the submission pollers. Only then is the session reported as ended, so the
//!   process never exits while a poller may still print.
//! - Terminal is absorbing.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    thread::{self, JoinHandle},
};

use duel_api::{DuelFinished, DuelId, DuelResult, DuelStarted, StreamEvent, SubmissionId, UserId};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    api::DuelApi,
    configuration::Configuration,
    console::Console,
    error::{ClientError, ValidationError},
    language::Language,
    listener::{spawn_listener, EventHandler, Flow},
    poller::PollerPool,
    shutdown::ShutdownSignal,
};

/// Lifecycle phase of the client.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub enum Phase {
    /// Logged in, not in the queue yet.
    #[default]
    Idle,
    /// Waiting for an opponent, the listener is running.
    Queued,
    /// Duel running, submissions accepted.
    Active,
    /// Duel over, reading the result and stopping workers.
    Finishing,
    /// Session over.
    Terminal,
}

/// The duel being played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duel {
    /// Id given by the service.
    pub id: DuelId,
    /// Known once the start event or the duel info carried it.
    pub opponent_id: Option<UserId>,
    /// Task played, known like the opponent.
    pub task_id: Option<String>,
    /// `Pending` until the duel is finished.
    pub result: DuelResult,
}

/// Client-side view of the session. Written by the controller only.
#[derive(Debug, Clone, Default)]
pub struct ClientState {
    /// Current phase.
    pub phase: Phase,
    /// Set from `DuelStarted` until the duel is finished.
    pub current_duel: Option<Duel>,
    /// True while submissions are accepted.
    pub is_duel_active: bool,
    /// Set when the workers were told to stop, by the end of the duel or by the user leaving.
    pub shutdown_requested: bool,
    /// Every phase entered so far, `Idle` first.
    pub history: Vec<Phase>,
}

impl ClientState {
    fn new() -> Self {
        Self {
            history: vec![Phase::Idle],
            ..Default::default()
        }
    }

    fn enter(&mut self, phase: Phase) {
        info!(from = ?self.phase, to = ?phase, "phase change");
        self.phase = phase;
        self.history.push(phase);
    }
}

/// How the session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEnd {
    /// The finished duel. Its result stays `Pending` when it could not be fetched.
    pub duel: Option<Duel>,
    /// Pollers that did not stop within the join timeout.
    pub detached_pollers: usize,
}

type EndNotifier = Box<dyn FnOnce(SessionEnd) + Send>;

/// Duel lifecycle state machine.
pub struct DuelController {
    api: DuelApi,
    console: Arc<dyn Console>,
    config: Configuration,
    state: RwLock<ClientState>,
    shutdown: ShutdownSignal,
    pollers: PollerPool,
    on_end: Mutex<Option<EndNotifier>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl DuelController {
    /// Controller in [`Phase::Idle`].
    pub fn new(api: DuelApi, console: Arc<dyn Console>, config: Configuration) -> Arc<Self> {
        let shutdown = ShutdownSignal::new();
        let pollers = PollerPool::new(
            api.clone(),
            console.clone(),
            shutdown.clone(),
            config.poll_interval,
        );
        Arc::new(Self {
            api,
            console,
            config,
            state: RwLock::new(ClientState::new()),
            shutdown,
            pollers,
            on_end: Mutex::new(None),
            listener: Mutex::new(None),
        })
    }

    /// Registers the callback run once the session reached [`Phase::Terminal`].
    ///
    /// It runs after the pollers were joined.
    pub fn on_end(&self, notify: impl FnOnce(SessionEnd) + Send + 'static) {
        *self.on_end.lock().unwrap_or_else(PoisonError::into_inner) = Some(Box::new(notify));
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.read_state().phase
    }

    /// True while submissions are accepted.
    pub fn is_duel_active(&self) -> bool {
        self.read_state().is_duel_active
    }

    /// Snapshot of the whole state.
    pub fn state(&self) -> ClientState {
        self.read_state().clone()
    }

    /// Signal raised when the workers must stop.
    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    /// Enters the duel queue: starts the event stream listener.
    ///
    /// # Errors
    /// [`ValidationError::AlreadyConnected`] unless the controller is [`Phase::Idle`].
    #[instrument(skip(self))]
    pub fn connect(self: &Arc<Self>) -> Result<(), ClientError> {
        {
            let mut state = self.write_state();
            if state.phase != Phase::Idle {
                return Err(ValidationError::AlreadyConnected.into());
            }
            state.enter(Phase::Queued);
        }

        let handler: Arc<dyn EventHandler> = self.clone();
        let listener = spawn_listener(
            self.api.clone(),
            handler,
            self.console.clone(),
            self.shutdown.clone(),
        )
        .map_err(ClientError::request)?;
        *self.listener.lock().unwrap_or_else(PoisonError::into_inner) = Some(listener);

        self.console.say("You joined the duel queue!");
        Ok(())
    }

    /// Waits for the listener thread, if one was started.
    pub fn join_listener(&self) {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(listener) = listener {
            if listener.join().is_err() {
                error!("listener panicked");
            }
        }
    }

    /// Sends the solution in `path` for the current duel and starts polling its verdict.
    ///
    /// # Errors
    /// - [`ValidationError`] without any request when no duel is active, the file cannot be read,
    ///   or its extension maps to no [`Language`].
    /// - Any [`ClientError`] of the submission request itself.
    #[instrument(skip(self))]
    pub fn submit(&self, path: &str) -> Result<SubmissionId, ClientError> {
        let duel_id = {
            let state = self.read_state();
            match (&state.current_duel, state.is_duel_active, state.phase) {
                (Some(duel), true, Phase::Active) => duel.id,
                _ => return Err(ValidationError::NotInDuel.into()),
            }
        };

        let path = Path::new(path);
        if !path.exists() {
            return Err(ValidationError::FileNotFound(path.to_owned()).into());
        }
        let solution =
            std::fs::read_to_string(path).map_err(|e| ValidationError::UnreadableFile {
                path: PathBuf::from(path),
                reason: e.to_string(),
            })?;
        let language = Language::from_path(path)?;

        let submission_id = self.api.submit(duel_id, &solution, language)?;
        info!(submission_id, %language, "solution submitted");
        self.console
            .say(&format!("Solution sent! Submission id: {submission_id}"));

        if let Err(e) = self.pollers.spawn(duel_id, submission_id) {
            error!("{e:#}");
            self.console
                .say(&format!("Could not follow submission {submission_id}: {e}"));
        }
        Ok(submission_id)
    }

    /// Leaves without waiting for the end of the duel: stops the workers and joins the pollers.
    ///
    /// Returns the number of pollers that did not stop in time.
    #[instrument(skip(self))]
    pub fn leave(&self) -> usize {
        self.write_state().shutdown_requested = true;
        self.shutdown.raise();
        if self.pollers.is_empty() {
            return 0;
        }
        self.pollers.join_all(self.config.join_timeout)
    }

    fn on_duel_started(&self, event: DuelStarted) -> Flow {
        let duel_id = event.duel_id;
        {
            let mut state = self.write_state();
            if state.phase != Phase::Queued {
                warn!(duel_id, phase = ?state.phase, "duel start outside of the queue, ignored");
                return Flow::Continue;
            }
            state.current_duel = Some(Duel {
                id: duel_id,
                opponent_id: event.opponent_id,
                task_id: event.task_id,
                result: DuelResult::Pending,
            });
            state.is_duel_active = true;
            state.enter(Phase::Active);
        }

        self.console
            .notify(&format!("=== THE DUEL HAS STARTED! ID: {duel_id} ==="));
        self.present_duel(duel_id);
        self.console
            .notify("To send a solution, use: submit <path_to_file>");
        Flow::Continue
    }

    /// Prints the opponent and the task. Failures are reported and otherwise ignored.
    fn present_duel(&self, duel_id: DuelId) {
        let info = match self.api.duel_info(duel_id) {
            Ok(info) => info,
            Err(e) => {
                warn!("duel info unavailable: {e}");
                self.console
                    .notify(&format!("Could not load the duel information: {e}"));
                return;
            }
        };

        if let Some(duel) = self.write_state().current_duel.as_mut() {
            duel.opponent_id = Some(info.opponent_id);
            duel.task_id = Some(info.task_id.clone());
        }

        let opponent = match self.api.user_info(info.opponent_id) {
            Ok(user) => user.nickname,
            Err(e) => {
                warn!("opponent info unavailable: {e}");
                "Unknown".to_owned()
            }
        };
        self.console.notify(&format!("Opponent: {opponent}"));

        match render_task(&self.api, &info.task_id) {
            Ok(text) => self.console.notify(&text),
            Err(e) => {
                warn!("task unavailable: {e}");
                self.console
                    .notify(&format!("Could not load the task: {e}"));
            }
        }
    }

    fn on_duel_finished(&self, event: DuelFinished) -> Flow {
        {
            let mut state = self.write_state();
            let is_current = state
                .current_duel
                .as_ref()
                .is_some_and(|duel| duel.id == event.duel_id);
            if !is_current || state.phase != Phase::Active {
                debug!(duel_id = event.duel_id, "stale duel end, ignored");
                return Flow::Continue;
            }
            state.enter(Phase::Finishing);
        }

        // the service stores the result slightly after announcing the end
        thread::sleep(self.config.finish_grace);

        let result = match self.api.duel_info(event.duel_id) {
            Ok(info) => {
                self.console.notify(&format!(
                    "=== DUEL RESULT: {} ===",
                    describe_result(info.result)
                ));
                Some(info.result)
            }
            Err(e) => {
                warn!("final duel info unavailable: {e}");
                self.console
                    .notify(&format!("Could not load the duel result: {e}"));
                None
            }
        };

        let duel = {
            let mut state = self.write_state();
            state.is_duel_active = false;
            state.shutdown_requested = true;
            state.current_duel.take().map(|mut duel| {
                duel.result = result.unwrap_or(duel.result);
                duel
            })
        };
        self.shutdown.raise();
        info!(pollers = self.pollers.len(), "stopping submission pollers");
        let detached_pollers = self.pollers.join_all(self.config.join_timeout);
        self.write_state().enter(Phase::Terminal);

        let end = SessionEnd {
            duel,
            detached_pollers,
        };
        info!(?end, "session ended");
        let notify = self
            .on_end
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(notify) = notify {
            notify(end);
        }
        Flow::Stop
    }

    fn read_state(&self) -> RwLockReadGuard<'_, ClientState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ClientState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventHandler for DuelController {
    fn handle_event(&self, event: StreamEvent) -> Flow {
        if self.phase() == Phase::Terminal {
            return Flow::Stop;
        }
        match event {
            StreamEvent::DuelStarted(started) => self.on_duel_started(started),
            StreamEvent::DuelFinished(finished) => self.on_duel_finished(finished),
        }
    }
}

fn describe_result(result: DuelResult) -> &'static str {
    match result {
        DuelResult::Win => "VICTORY!",
        DuelResult::Lose => "DEFEAT",
        DuelResult::Draw | DuelResult::Pending => "DRAW",
    }
}

/// Title, limits, statement and sample tests of a task, ready to print.
///
/// A test is listed only if both its input and output could be fetched.
fn render_task(api: &DuelApi, task_id: &str) -> Result<String, ClientError> {
    let task = api.task(task_id)?.task;

    let mut text = format!(
        "=== TASK: {} ===\nLimits: TL={}ms, ML={}MB",
        task.title, task.time_limit, task.memory_limit
    );

    match api.task_file(task_id, &task.statement_ref) {
        Ok(statement) => text.push_str(&format!("\n\n--- STATEMENT ---\n{statement}")),
        Err(e) => warn!(file = %task.statement_ref, "statement unavailable: {e}"),
    }

    text.push_str("\n\n--- TESTS ---");
    for test in &task.tests {
        let input = api.task_file(task_id, &test.input_ref);
        let output = api.task_file(task_id, &test.output_ref);
        match (input, output) {
            (Ok(input), Ok(output)) => text.push_str(&format!(
                "\n\nTest {}:\nInput:\n{input}\nExpected output:\n{output}",
                test.order
            )),
            (Err(e), _) | (_, Err(e)) => warn!(order = test.order, "test files unavailable: {e}"),
        }
    }
    Ok(text)
}
