//! Tool abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default timeout for a command.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Why a tool produced no output.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The command ran past its timeout and was killed
    #[error("Command timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    /// The command could not be started
    #[error("Failed to launch command: {0}")]
    Launch(#[from] std::io::Error),
}

/// Something that runs a command line.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get tool name.
    fn name(&self) -> &str;

    /// Run the command. A non-zero exit is an `Ok` with that exit code.
    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput, ToolError>;
}

/// Input to a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInput {
    /// Command line, interpreted by the shell
    pub command: String,

    /// Working directory, current directory if unset
    pub working_dir: Option<PathBuf>,

    /// Extra environment variables
    pub env: HashMap<String, String>,

    /// Timeout
    pub timeout: Duration,
}

impl ToolInput {
    /// Create an input with the default timeout.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            working_dir: None,
            env: HashMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the working directory.
    pub fn with_working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Output from a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Exit code, -1 when terminated by a signal
    pub exit_code: i32,

    /// Standard output
    pub stdout: String,

    /// Standard error
    pub stderr: String,

    /// Execution duration
    pub duration: Duration,
}

impl ToolOutput {
    /// Whether the exit code is zero.
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}
