//! Tracker configuration.

use labtrack_storage::default_persist_file;
use std::path::PathBuf;

/// How a tracker names itself and persists.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Lab name, used in reports and the default file name
    pub lab_name: String,

    /// Whether progress is written to disk
    pub persist: bool,

    /// Progress file, derived from the lab name if unset
    pub persist_file: Option<PathBuf>,

    /// Whether every mutation saves
    pub auto_save: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            lab_name: "Lab".to_string(),
            persist: false,
            persist_file: None,
            auto_save: true,
        }
    }
}

impl TrackerConfig {
    /// Create a config for a lab.
    pub fn new(lab_name: impl Into<String>) -> Self {
        Self {
            lab_name: lab_name.into(),
            ..Default::default()
        }
    }

    /// Set persistence.
    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    /// Set the progress file.
    pub fn with_persist_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.persist_file = Some(path.into());
        self
    }

    /// Set auto-save.
    pub fn with_auto_save(mut self, auto_save: bool) -> Self {
        self.auto_save = auto_save;
        self
    }

    /// The file progress is written to.
    pub fn effective_persist_file(&self) -> PathBuf {
        self.persist_file
            .clone()
            .unwrap_or_else(|| default_persist_file(&self.lab_name))
    }
}
