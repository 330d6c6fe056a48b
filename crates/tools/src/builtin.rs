//! Built-in tools (system shell, scripted replies).

use super::r#trait::*;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::Mutex;
use tokio::process::Command;

/// Runs command lines through the system shell.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellTool;

impl ShellTool {
    fn command(line: &str) -> Command {
        #[cfg(windows)]
        {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(line);
            cmd
        }
        #[cfg(not(windows))]
        {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(line);
            cmd
        }
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();

        let mut cmd = Self::command(&input.command);
        if let Some(dir) = &input.working_dir {
            cmd.current_dir(dir);
        }
        for (k, v) in &input.env {
            cmd.env(k, v);
        }
        cmd.stdin(Stdio::null()).kill_on_drop(true);

        tracing::debug!("Running shell command: {}", input.command);
        let output = match tokio::time::timeout(input.timeout, cmd.output()).await {
            Ok(result) => result?,
            Err(_) => return Err(ToolError::Timeout(input.timeout)),
        };

        Ok(ToolOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration: start.elapsed(),
        })
    }
}

/// Canned reply for [`ScriptedTool`].
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Exit with this code and stdout
    Exit {
        /// Exit code
        code: i32,
        /// Standard output
        stdout: String,
    },
    /// Report a timeout
    Timeout,
    /// Report a launch failure with this message
    LaunchError(String),
}

/// Tool that replays canned replies in order, for dry runs and tests.
///
/// Once the script is exhausted every command exits 0 with empty output.
#[derive(Debug, Default)]
pub struct ScriptedTool {
    replies: Mutex<VecDeque<ScriptedReply>>,
    seen: Mutex<Vec<ToolInput>>,
}

impl ScriptedTool {
    /// Create a tool with the given replies.
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Inputs received so far.
    pub fn inputs(&self) -> Vec<ToolInput> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Tool for ScriptedTool {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput, ToolError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(input.clone());
        }
        let reply = self.replies.lock().ok().and_then(|mut r| r.pop_front());
        match reply {
            Some(ScriptedReply::Exit { code, stdout }) => Ok(ToolOutput {
                exit_code: code,
                stdout,
                stderr: String::new(),
                duration: std::time::Duration::ZERO,
            }),
            Some(ScriptedReply::Timeout) => Err(ToolError::Timeout(input.timeout)),
            Some(ScriptedReply::LaunchError(msg)) => Err(ToolError::Launch(
                std::io::Error::new(std::io::ErrorKind::NotFound, msg),
            )),
            None => Ok(ToolOutput {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
                duration: std::time::Duration::ZERO,
            }),
        }
    }
}
