//! Display surface - where the tracker and validator report to.
//!
//! Rendering is fire-and-forget: a surface receives derived views and
//! returns nothing. Every method has a no-op default so a surface only
//! implements what it shows.

use crate::step::StepStatus;
use crate::Time;
use std::sync::Mutex;

/// Derived view of a session, handed to the surface after each mutation.
#[derive(Debug, Clone)]
pub struct ProgressView {
    /// Lab name
    pub lab_name: String,
    /// Completed percentage in [0, 100]
    pub completion_rate: f64,
    /// Mean score of scored completed steps
    pub average_score: Option<f64>,
    /// Steps in registry order
    pub steps: Vec<StepView>,
    /// Completed step count
    pub completed: usize,
    /// Total step count
    pub total: usize,
    /// Time since the session started
    pub elapsed: chrono::Duration,
    /// Whether the session was restored from disk
    pub resumed: bool,
}

/// One step in a [`ProgressView`].
#[derive(Debug, Clone)]
pub struct StepView {
    /// Step name
    pub name: String,
    /// Derived status
    pub status: StepStatus,
    /// Completion time
    pub timestamp: Option<Time>,
    /// Attempts recorded
    pub attempts: u32,
    /// Score
    pub score: Option<f64>,
    /// Notes
    pub notes: String,
}

/// Outcome of one validator check.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFeedback {
    /// Whether the check passed
    pub success: bool,
    /// Headline
    pub message: String,
    /// Extra detail, may be empty
    pub details: String,
}

/// Shell runner notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellNotice {
    /// A command is about to run
    Started {
        /// Step name
        step: String,
        /// Command line
        command: String,
        /// Directory it runs in
        working_dir: String,
    },
    /// A command exited
    Finished {
        /// Command line
        command: String,
        /// Exit code
        returncode: i32,
        /// Captured stdout
        stdout: String,
        /// Captured stderr
        stderr: String,
        /// Wall time in seconds
        execution_time: f64,
        /// Whether the success criteria held
        success: bool,
        /// Substring that was required in stdout
        expected_output: Option<String>,
    },
    /// A command hit its timeout
    TimedOut {
        /// Command line
        command: String,
        /// Timeout in seconds
        timeout: u64,
    },
    /// A command could not be launched
    Failed {
        /// Command line
        command: String,
        /// Error message
        error: String,
    },
    /// A sequence is starting
    SequenceStarted {
        /// Step name
        step: String,
        /// Number of commands
        count: usize,
        /// Whether the first failure stops it
        stop_on_error: bool,
    },
    /// A sequence ended
    SequenceFinished {
        /// Commands that succeeded
        succeeded: usize,
        /// Commands in the sequence
        total: usize,
        /// Whether all succeeded
        success: bool,
    },
}

/// Rendering collaborator.
pub trait DisplaySurface: Send + Sync {
    /// Show the progress panel.
    fn show_progress(&self, _view: &ProgressView, _detailed: bool) {}

    /// Show a warning line.
    fn show_warning(&self, _message: &str) {}

    /// Show an informational message.
    fn show_info(&self, _title: &str, _message: &str) {}

    /// Show a validator outcome.
    fn show_validation(&self, _feedback: &ValidationFeedback) {}

    /// Show shell runner output.
    fn show_shell(&self, _notice: &ShellNotice) {}
}

/// Surface that shows nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplay;

impl DisplaySurface for NullDisplay {}

/// Surface that keeps a text line per notification, for headless runs and tests.
#[derive(Debug, Default)]
pub struct MemoryDisplay {
    lines: Mutex<Vec<String>>,
}

impl MemoryDisplay {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Whether any recorded line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }

    fn push(&self, line: String) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line);
        }
    }
}

impl DisplaySurface for MemoryDisplay {
    fn show_progress(&self, view: &ProgressView, _detailed: bool) {
        self.push(format!(
            "progress {} {:.1}% ({}/{})",
            view.lab_name, view.completion_rate, view.completed, view.total
        ));
    }

    fn show_warning(&self, message: &str) {
        self.push(format!("warning {message}"));
    }

    fn show_info(&self, title: &str, message: &str) {
        self.push(format!("info {title}: {message}"));
    }

    fn show_validation(&self, feedback: &ValidationFeedback) {
        let mark = if feedback.success { "pass" } else { "fail" };
        if feedback.details.is_empty() {
            self.push(format!("{mark} {}", feedback.message));
        } else {
            self.push(format!("{mark} {} - {}", feedback.message, feedback.details));
        }
    }

    fn show_shell(&self, notice: &ShellNotice) {
        self.push(format!("shell {notice:?}"));
    }
}
