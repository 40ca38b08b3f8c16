use std::{
    sync::{Arc, Condvar, Mutex, PoisonError},
    time::{Duration, Instant},
};

/// Cooperative stop flag shared by the listener and the submission pollers.
///
/// Raising it never interrupts a request in flight: workers look at it between two units of
/// work. Sleeping workers are woken up immediately.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl ShutdownSignal {
    /// Signal not raised yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the signal for every clone and wakes up the sleepers. Cannot be lowered.
    pub fn raise(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    /// True once [`raise`](Self::raise) was called on any clone.
    pub fn is_raised(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleeps for `duration` or until the signal is raised. Returns true if it was raised.
    pub fn wait_timeout(&self, duration: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let deadline = Instant::now() + duration;
        let mut raised = lock.lock().unwrap_or_else(PoisonError::into_inner);
        while !*raised {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            raised = cvar
                .wait_timeout(raised, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        *raised
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn wait_times_out_when_not_raised() {
        let signal = ShutdownSignal::new();
        assert!(!signal.wait_timeout(Duration::from_millis(10)));
        assert!(!signal.is_raised());
    }

    #[test]
    fn raise_wakes_sleepers() {
        let signal = ShutdownSignal::new();
        let sleeper = {
            let signal = signal.clone();
            thread::spawn(move || {
                let start = Instant::now();
                let raised = signal.wait_timeout(Duration::from_secs(30));
                (raised, start.elapsed())
            })
        };
        thread::sleep(Duration::from_millis(20));
        signal.raise();
        let (raised, elapsed) = sleeper.join().unwrap();
        assert!(raised);
        assert!(elapsed < Duration::from_secs(30));
    }
}
