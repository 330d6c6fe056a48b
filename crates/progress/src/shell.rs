//! Shell step runner.
//!
//! Runs a command for a step through the tracker's [`Tool`], reports the
//! outcome to the display surface and records a `shell_*` event. Failures
//! never surface as `Err`: the returned flag says whether the step's command
//! succeeded, and `Err` is reserved for auto-save failures.
//!
//! [`Tool`]: labtrack_tools::Tool

use labtrack_core::{time, EventKind, ShellNotice};
use labtrack_tools::{ToolError, ToolInput, DEFAULT_TIMEOUT};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;
use crate::tracker::LabProgress;

/// Options for [`LabProgress::run_shell_step`].
#[derive(Debug, Clone, PartialEq)]
pub struct ShellStepOptions {
    /// Substring stdout must contain for the run to count as a success
    pub expected_output: Option<String>,
    /// Kill the command after this long
    pub timeout: Duration,
    /// Directory to run in, current directory if unset
    pub working_dir: Option<PathBuf>,
    /// Mark the step done when the command succeeds
    pub auto_mark_complete: bool,
}

impl Default for ShellStepOptions {
    fn default() -> Self {
        Self {
            expected_output: None,
            timeout: DEFAULT_TIMEOUT,
            working_dir: None,
            auto_mark_complete: true,
        }
    }
}

impl ShellStepOptions {
    /// Require a substring in stdout.
    pub fn expect(mut self, output: impl Into<String>) -> Self {
        self.expected_output = Some(output.into());
        self
    }

    /// Set the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set whether success marks the step done.
    pub fn auto_mark_complete(mut self, auto: bool) -> Self {
        self.auto_mark_complete = auto;
        self
    }
}

/// Options for [`LabProgress::run_shell_sequence`].
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceOptions {
    /// Directory every command runs in
    pub working_dir: Option<PathBuf>,
    /// Stop at the first failing command
    pub stop_on_error: bool,
    /// Timeout applied to each command
    pub timeout_per_command: Duration,
}

impl Default for SequenceOptions {
    fn default() -> Self {
        Self {
            working_dir: None,
            stop_on_error: true,
            timeout_per_command: DEFAULT_TIMEOUT,
        }
    }
}

/// Name under which the `index`th (1-based) command of a sequence is recorded.
pub fn sub_command_name(step: &str, index: usize) -> String {
    format!("{step}_cmd_{index}")
}

impl LabProgress {
    /// Run one command for a step.
    ///
    /// Success means exit code 0 and, when set, the expected substring in
    /// stdout. On success with `auto_mark_complete` the step is marked done
    /// with score 100. A failing exit counts an attempt on a known step; a
    /// timeout or a launch error does not.
    pub async fn run_shell_step(
        &mut self,
        step: &str,
        command: &str,
        options: &ShellStepOptions,
    ) -> Result<bool> {
        if !self.step_start_times.contains_key(step) {
            self.step_start_times.insert(step.to_string(), time::now());
        }

        let working_dir = match &options.working_dir {
            Some(dir) => dir.display().to_string(),
            None => std::env::current_dir()
                .map(|d| d.display().to_string())
                .unwrap_or_default(),
        };
        self.display.show_shell(&ShellNotice::Started {
            step: step.to_string(),
            command: command.to_string(),
            working_dir: working_dir.clone(),
        });

        let input = ToolInput::new(command)
            .with_working_dir(options.working_dir.clone())
            .with_timeout(options.timeout);

        match self.tool.execute(&input).await {
            Ok(output) => {
                let success = output.succeeded()
                    && options
                        .expected_output
                        .as_deref()
                        .map_or(true, |expected| output.stdout.contains(expected));
                let execution_time = output.duration.as_secs_f64();
                tracing::debug!(
                    "Shell command for {} exited {} in {:.2}s",
                    step,
                    output.exit_code,
                    execution_time
                );

                self.display.show_shell(&ShellNotice::Finished {
                    command: command.to_string(),
                    returncode: output.exit_code,
                    stdout: output.stdout,
                    stderr: output.stderr,
                    execution_time,
                    success,
                    expected_output: options.expected_output.clone(),
                });
                self.record_event(
                    Some(step),
                    EventKind::ShellCommand {
                        command: command.to_string(),
                        returncode: output.exit_code,
                        execution_time,
                        success,
                        working_dir,
                    },
                );

                if success && options.auto_mark_complete && self.steps.contains(step) {
                    self.mark_done(step, Some(100.0), "Shell command executed successfully")
                        .await?;
                } else if !success && self.steps.contains(step) {
                    self.increment_attempts(step).await?;
                } else {
                    self.autosave().await?;
                }
                Ok(success)
            }
            Err(ToolError::Timeout(timeout)) => {
                tracing::warn!("Shell command for {} timed out: {}", step, command);
                self.display.show_shell(&ShellNotice::TimedOut {
                    command: command.to_string(),
                    timeout: timeout.as_secs(),
                });
                self.record_event(
                    Some(step),
                    EventKind::ShellTimeout {
                        command: command.to_string(),
                        timeout: timeout.as_secs(),
                    },
                );
                self.autosave().await?;
                Ok(false)
            }
            Err(e) => {
                tracing::error!("Shell command for {} failed: {}", step, e);
                self.display.show_shell(&ShellNotice::Failed {
                    command: command.to_string(),
                    error: e.to_string(),
                });
                self.record_event(
                    Some(step),
                    EventKind::ShellError {
                        command: command.to_string(),
                        error: e.to_string(),
                    },
                );
                self.autosave().await?;
                Ok(false)
            }
        }
    }

    /// Run commands in order for a step.
    ///
    /// Each command is recorded under [`sub_command_name`] without marking
    /// anything done. When all succeed the step is marked done with score
    /// 100; otherwise the step gets an attempt and partial progress equal to
    /// the fraction of commands that succeeded.
    pub async fn run_shell_sequence<S: AsRef<str>>(
        &mut self,
        step: &str,
        commands: &[S],
        options: &SequenceOptions,
    ) -> Result<bool> {
        let total = commands.len();
        self.display.show_shell(&ShellNotice::SequenceStarted {
            step: step.to_string(),
            count: total,
            stop_on_error: options.stop_on_error,
        });

        let per_command = ShellStepOptions {
            expected_output: None,
            timeout: options.timeout_per_command,
            working_dir: options.working_dir.clone(),
            auto_mark_complete: false,
        };

        let mut succeeded = 0;
        let mut all_succeeded = true;
        for (i, command) in commands.iter().enumerate() {
            let name = sub_command_name(step, i + 1);
            if self
                .run_shell_step(&name, command.as_ref(), &per_command)
                .await?
            {
                succeeded += 1;
            } else {
                all_succeeded = false;
                if options.stop_on_error {
                    break;
                }
            }
        }

        self.display.show_shell(&ShellNotice::SequenceFinished {
            succeeded,
            total,
            success: all_succeeded,
        });
        tracing::info!("Shell sequence for {}: {}/{} succeeded", step, succeeded, total);

        if !self.steps.contains(step) {
            return Ok(all_succeeded);
        }
        if all_succeeded {
            let notes = format!("All {total} shell commands executed successfully");
            self.mark_done(step, Some(100.0), &notes).await?;
        } else {
            self.increment_attempts(step).await?;
            let fraction = if total == 0 {
                0.0
            } else {
                succeeded as f64 / total as f64
            };
            self.mark_partial(step, fraction, "", None).await?;
        }
        Ok(all_succeeded)
    }
}
