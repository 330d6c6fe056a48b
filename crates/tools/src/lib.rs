//! Tool Integration
//!
//! Run shell commands for lab steps, with a timeout.

#![warn(missing_docs)]

pub mod r#trait;
pub mod builtin;

pub use r#trait::{Tool, ToolError, ToolInput, ToolOutput, DEFAULT_TIMEOUT};
pub use builtin::{ScriptedReply, ScriptedTool, ShellTool};
