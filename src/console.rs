//! Where user-visible text goes.

use std::{
    io::Write,
    sync::{Mutex, PoisonError},
};

/// Output seam shared by the prompt thread and the background workers.
pub trait Console: Send + Sync {
    /// Direct answer to something the user just typed.
    fn say(&self, text: &str);

    /// Notification coming from a background thread, while the prompt may be displayed.
    fn notify(&self, text: &str);

    /// Shows that the user may type the next command.
    fn prompt(&self) {}
}

/// Console writing to stdout.
#[derive(Debug, Default)]
pub struct StdoutConsole;

impl Console for StdoutConsole {
    fn say(&self, text: &str) {
        println!("{text}");
    }

    fn notify(&self, text: &str) {
        // move away from the prompt, then draw it again
        let mut stdout = std::io::stdout().lock();
        let _ = write!(stdout, "\n\n{text}\n\n> ");
        let _ = stdout.flush();
    }

    fn prompt(&self) {
        let mut stdout = std::io::stdout().lock();
        let _ = write!(stdout, "\n> ");
        let _ = stdout.flush();
    }
}

/// Console keeping every line in memory, in order.
#[derive(Debug, Default)]
pub struct MemoryConsole {
    lines: Mutex<Vec<String>>,
}

impl MemoryConsole {
    /// Empty console.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every line written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded lines containing `needle`.
    pub fn count(&self, needle: &str) -> usize {
        self.lines().iter().filter(|l| l.contains(needle)).count()
    }

    fn push(&self, text: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_owned());
    }
}

impl Console for MemoryConsole {
    fn say(&self, text: &str) {
        self.push(text);
    }

    fn notify(&self, text: &str) {
        self.push(text);
    }
}
