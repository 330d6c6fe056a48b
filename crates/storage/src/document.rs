//! On-disk shape of a saved session.

use labtrack_core::{Event, SessionId, StepMetadata, StepRegistry, StudentId, Time};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Snapshot of a session as written to the progress file.
///
/// There is no schema version; keys added over time are optional and
/// default when absent, then [`ProgressDocument::migrate`] repairs records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressDocument {
    /// Lab name
    pub lab_name: String,

    /// Steps in display order
    pub steps: StepRegistry,

    /// When the session started
    #[serde(default = "labtrack_core::time::now", with = "labtrack_core::time::flexible")]
    pub start_time: Time,

    /// Session that wrote the file
    #[serde(default)]
    pub session_id: Option<SessionId>,

    /// Student owning the session
    #[serde(default)]
    pub student_id: Option<StudentId>,

    /// When the file was written
    #[serde(default, with = "labtrack_core::time::flexible_option")]
    pub last_saved: Option<Time>,

    /// Guidance per step
    #[serde(default)]
    pub step_metadata: BTreeMap<String, StepMetadata>,

    /// Analytics log
    #[serde(default)]
    pub analytics_data: Vec<Event>,

    /// First time each step was started
    #[serde(default, with = "labtrack_core::time::flexible_map")]
    pub step_start_times: BTreeMap<String, Time>,

    /// Auto-grading result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<f64>,
}

impl ProgressDocument {
    /// Create a document for a fresh session.
    pub fn new(lab_name: impl Into<String>, steps: StepRegistry) -> Self {
        Self {
            lab_name: lab_name.into(),
            steps,
            start_time: labtrack_core::time::now(),
            session_id: None,
            student_id: None,
            last_saved: None,
            step_metadata: BTreeMap::new(),
            analytics_data: Vec::new(),
            step_start_times: BTreeMap::new(),
            overall_score: None,
        }
    }

    /// Bring a freshly read document up to the current model.
    ///
    /// Clamps out-of-range progress, gives completed steps without a
    /// timestamp the last save time, and drops start times of unknown steps
    /// that are not sub-commands of a known step. Returns the number of
    /// repairs made.
    pub fn migrate(&mut self) -> usize {
        let fallback = self.last_saved.unwrap_or(self.start_time);
        let mut repairs = 0;
        for (_, step) in self.steps.iter_mut() {
            if step.normalize(fallback) {
                repairs += 1;
            }
        }

        let steps = &self.steps;
        let before = self.step_start_times.len();
        self.step_start_times.retain(|name, _| {
            steps.contains(name) || steps.names().iter().any(|s| is_sub_command_of(name, s))
        });
        repairs += before - self.step_start_times.len();

        if repairs > 0 {
            tracing::debug!("Migrated progress document for {}: {} repairs", self.lab_name, repairs);
        }
        repairs
    }
}

/// Whether `name` is the `{step}_cmd_{n}` name of a sequence sub-command.
pub fn is_sub_command_of(name: &str, step: &str) -> bool {
    name.strip_prefix(step)
        .and_then(|rest| rest.strip_prefix("_cmd_"))
        .map(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY: &str = r#"{
        "lab_name": "Old Lab",
        "steps": {
            "Setup": {"completed": true, "timestamp": "2024-01-02T10:00:00", "attempts": 1, "score": 90, "notes": ""},
            "Train": {"completed": false, "timestamp": null, "attempts": 0, "score": null, "notes": ""}
        },
        "start_time": "2024-01-02T09:30:00.250000"
    }"#;

    #[test]
    fn test_reads_file_without_optional_keys() {
        let mut doc: ProgressDocument = serde_json::from_str(LEGACY).unwrap();
        assert_eq!(doc.migrate(), 0);
        assert_eq!(doc.lab_name, "Old Lab");
        assert_eq!(doc.steps.names(), vec!["Setup", "Train"]);
        assert_eq!(doc.steps.get("Setup").unwrap().score, Some(90.0));
        assert!(doc.session_id.is_none());
        assert!(doc.student_id.is_none());
        assert!(doc.analytics_data.is_empty());
        assert!(doc.step_start_times.is_empty());
    }

    #[test]
    fn test_migrate_repairs_records() {
        let json = r#"{
            "lab_name": "L",
            "steps": {"A": {"completed": true, "partial_progress": 50.0}},
            "start_time": "2024-01-02T09:30:00Z",
            "last_saved": "2024-01-02T11:00:00Z",
            "step_start_times": {"A": "2024-01-02T09:31:00Z", "A_cmd_1": "2024-01-02T09:32:00Z", "Gone": "2024-01-02T09:33:00Z"}
        }"#;
        let mut doc: ProgressDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.migrate(), 2);

        let a = doc.steps.get("A").unwrap();
        assert_eq!(a.partial_progress, 1.0);
        assert_eq!(a.timestamp, doc.last_saved);
        assert_eq!(doc.step_start_times.len(), 2);
        assert!(doc.step_start_times.contains_key("A_cmd_1"));
    }

    #[test]
    fn test_sub_command_names() {
        assert!(is_sub_command_of("Build_cmd_2", "Build"));
        assert!(!is_sub_command_of("Build_cmd_", "Build"));
        assert!(!is_sub_command_of("Builder_cmd_1", "Build"));
    }

    #[test]
    fn test_overall_score_omitted_when_unset() {
        let doc = ProgressDocument::new("L", StepRegistry::from_names(["A"]));
        let value = serde_json::to_value(&doc).unwrap();
        assert!(value.get("overall_score").is_none());
        assert!(value["last_saved"].is_null());
    }
}
