//! Background polling of submission verdicts.
//!
//! Each accepted submission gets its own worker thread, which asks the service for the
//! submission status at a fixed interval until grading is done or the duel ends. Workers only
//! touch their own submission, the pool only keeps their handles for the final join.

use std::{
    sync::{
        mpsc::{self, Receiver, RecvTimeoutError},
        Arc, Mutex, PoisonError,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{bail, Context};
use duel_api::{DuelId, SubmissionId, SubmissionView};
use tracing::{debug, info, instrument, warn};

use crate::{api::DuelApi, console::Console, shutdown::ShutdownSignal};

/// Remembers the last message shown for one submission, so that a message repeated by the
/// service is displayed only once.
#[derive(Debug, Default)]
pub struct MessageTracker {
    last: Option<String>,
}

impl MessageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `message` is non-empty and differs from the last one shown. The message then
    /// becomes the last one shown.
    pub fn should_show(&mut self, message: Option<&str>) -> bool {
        match message {
            Some(m) if !m.is_empty() && self.last.as_deref() != Some(m) => {
                self.last = Some(m.to_owned());
                true
            }
            _ => false,
        }
    }
}

struct Worker {
    submission_id: SubmissionId,
    handle: JoinHandle<()>,
    // disconnected once the worker returned (or panicked)
    done: Receiver<()>,
}

/// Owner of every submission worker of the current duel.
pub struct PollerPool {
    api: DuelApi,
    console: Arc<dyn Console>,
    shutdown: ShutdownSignal,
    interval: Duration,
    workers: Mutex<Vec<Worker>>,
}

impl PollerPool {
    pub fn new(
        api: DuelApi,
        console: Arc<dyn Console>,
        shutdown: ShutdownSignal,
        interval: Duration,
    ) -> Self {
        Self {
            api,
            console,
            shutdown,
            interval,
            workers: Mutex::new(vec![]),
        }
    }

    /// Starts polling `submission_id` on a new thread.
    ///
    /// Refused once the shutdown signal is raised. The check is made under the worker list lock,
    /// so a worker is either started before [`join_all`](Self::join_all) takes the list or not
    /// at all.
    pub fn spawn(&self, duel_id: DuelId, submission_id: SubmissionId) -> anyhow::Result<()> {
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        if self.shutdown.is_raised() {
            bail!("the session is closing");
        }

        let (done_tx, done) = mpsc::channel::<()>();
        let api = self.api.clone();
        let console = self.console.clone();
        let shutdown = self.shutdown.clone();
        let interval = self.interval;

        let handle = thread::Builder::new()
            .name(format!("submission-{submission_id}"))
            .spawn(move || {
                let _done_tx = done_tx;
                poll_submission(&api, &*console, &shutdown, interval, duel_id, submission_id);
            })
            .with_context(|| format!("could not start poller for submission {submission_id}"))?;

        workers.push(Worker {
            submission_id,
            handle,
            done,
        });
        debug!(submission_id, "poller started");
        Ok(())
    }

    /// Number of workers not yet joined.
    pub fn len(&self) -> usize {
        self.workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits for every worker, at most `timeout` each. Workers still running after their
    /// timeout are detached.
    ///
    /// Returns the number of detached workers. The shutdown signal should be raised before,
    /// otherwise workers only stop once their submission is graded.
    #[instrument(skip(self))]
    pub fn join_all(&self, timeout: Duration) -> usize {
        let workers = std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        let mut detached = 0;
        for worker in workers {
            match worker.done.recv_timeout(timeout) {
                Err(RecvTimeoutError::Timeout) => {
                    warn!(submission_id = worker.submission_id, "poller did not stop in time");
                    detached += 1;
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    if worker.handle.join().is_err() {
                        warn!(submission_id = worker.submission_id, "poller panicked");
                    }
                }
            }
        }
        detached
    }
}

#[instrument(skip(api, console, shutdown, interval))]
fn poll_submission(
    api: &DuelApi,
    console: &dyn Console,
    shutdown: &ShutdownSignal,
    interval: Duration,
    duel_id: DuelId,
    submission_id: SubmissionId,
) {
    let mut tracker = MessageTracker::new();
    let mut auth_reported = false;
    loop {
        if shutdown.is_raised() {
            debug!("stopped by shutdown");
            return;
        }

        match api.submission(duel_id, submission_id) {
            Ok(view) => {
                if let Some(message) = view.message.as_deref() {
                    if tracker.should_show(Some(message)) {
                        console.notify(&format!("Submission {submission_id}: {message}"));
                    }
                }
                if view.is_done() {
                    info!(verdict = ?view.verdict, "submission graded");
                    console.notify(&final_report(submission_id, &view));
                    return;
                }
            }
            // polled again on the next tick
            Err(e) => {
                warn!("status request failed: {e}");
                if e.is_auth_failure() && !auth_reported {
                    auth_reported = true;
                    console.notify(&format!(
                        "Submission {submission_id}: cannot check the status, {e}. Log in again to follow it."
                    ));
                }
            }
        }

        if shutdown.wait_timeout(interval) {
            debug!("stopped by shutdown");
            return;
        }
    }
}

fn final_report(submission_id: SubmissionId, view: &SubmissionView) -> String {
    let verdict = view.verdict.as_deref().unwrap_or("Unknown");
    let mut report = format!("=== SUBMISSION {submission_id} RESULT ===\nVerdict: {verdict}");
    if let Some(message) = view.message.as_deref().filter(|m| !m.is_empty()) {
        report.push_str(&format!("\nMessage: {message}"));
    }
    report
}
