//! Persistence for labtrack sessions.
//!
//! A trait-based store with a JSON file implementation, plus the rules for
//! naming progress files and finding one to resume from.

#![warn(missing_docs)]

pub mod trait_;
pub mod document;
pub mod json_storage;
pub mod paths;

pub use trait_::{ProgressStore, StorageError, Result};
pub use document::{is_sub_command_of, ProgressDocument};
pub use json_storage::JsonProgressStore;
pub use paths::{default_persist_file, discover_progress_file, resolve_progress_file};
