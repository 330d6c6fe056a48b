//! JSON file store.
//!
//! One pretty-printed JSON file per session. Saves are a plain overwrite,
//! not an atomic rename.

use std::path::{Path, PathBuf};

use super::{ProgressDocument, ProgressStore, Result, StorageError};
use tokio::fs;

/// File-based JSON progress store.
#[derive(Debug, Clone)]
pub struct JsonProgressStore {
    path: PathBuf,
}

impl JsonProgressStore {
    /// Create a store for `path`. Nothing is touched until the first save.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the progress file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl ProgressStore for JsonProgressStore {
    async fn save(&self, document: &ProgressDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(document)?;
        fs::write(&self.path, json.as_bytes()).await?;
        tracing::debug!("Saved progress to {}", self.path.display());
        Ok(())
    }

    async fn load(&self) -> Result<ProgressDocument> {
        let json = match fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(self.path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let mut document: ProgressDocument = serde_json::from_str(&json)?;
        document.migrate();
        Ok(document)
    }

    async fn exists(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labtrack_core::{
        Checkpoint, Event, EventKind, SessionId, StepMetadata, StepRegistry, StudentId,
    };
    use tempfile::TempDir;

    fn sample_document() -> ProgressDocument {
        let mut steps = StepRegistry::from_names(["A", "B", "C"]);
        let now = labtrack_core::time::now();
        steps.get_mut("A").unwrap().complete(now, Some(95.0), "quick");
        let b = steps.get_mut("B").unwrap();
        b.set_partial(0.7);
        b.push_checkpoint(Checkpoint {
            name: "half".to_string(),
            progress: 0.7,
            timestamp: now,
        });

        let mut doc = ProgressDocument::new("Round Trip", steps);
        doc.session_id = Some(SessionId::new());
        doc.student_id = Some(StudentId::new());
        doc.last_saved = Some(now);
        doc.step_metadata
            .insert("A".to_string(), StepMetadata::new("Do A").with_hint("start here"));
        doc.step_start_times.insert("B".to_string(), now);
        doc.analytics_data.push(Event {
            timestamp: now,
            session_id: doc.session_id.clone().unwrap(),
            student_id: doc.student_id.clone().unwrap(),
            lab_name: doc.lab_name.clone(),
            step_name: Some("B".to_string()),
            kind: EventKind::PartialProgress {
                progress: 0.7,
                checkpoint_name: Some("half".to_string()),
                notes: String::new(),
            },
        });
        doc
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = JsonProgressStore::new(dir.path().join("progress.json"));
        let doc = sample_document();

        assert!(!store.exists().await);
        store.save(&doc).await.unwrap();
        assert!(store.exists().await);

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.lab_name, doc.lab_name);
        assert_eq!(loaded.session_id, doc.session_id);
        assert_eq!(loaded.student_id, doc.student_id);
        assert_eq!(loaded.steps.names(), doc.steps.names());
        assert_eq!(loaded.step_metadata, doc.step_metadata);
        assert_eq!(loaded.analytics_data.len(), 1);

        let (a, orig_a) = (loaded.steps.get("A").unwrap(), doc.steps.get("A").unwrap());
        assert_eq!(a.completed, orig_a.completed);
        assert_eq!(a.score, orig_a.score);
        assert_eq!(a.notes, orig_a.notes);
        assert_eq!(
            a.timestamp.map(|t| t.timestamp()),
            orig_a.timestamp.map(|t| t.timestamp())
        );
        assert_eq!(loaded.steps.get("B").unwrap().checkpoints.len(), 1);
        assert_eq!(loaded.start_time.timestamp(), doc.start_time.timestamp());
    }

    #[tokio::test]
    async fn test_file_has_expected_top_level_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("p.json");
        let store = JsonProgressStore::new(&path);
        store.save(&sample_document()).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        for key in [
            "lab_name",
            "steps",
            "start_time",
            "session_id",
            "student_id",
            "last_saved",
            "step_metadata",
            "analytics_data",
            "step_start_times",
        ] {
            assert!(raw.get(key).is_some(), "missing {key}");
        }
        assert!(raw["step_start_times"]["B"].is_string());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = JsonProgressStore::new(dir.path().join("absent.json"));
        assert!(matches!(store.load().await, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_load_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = JsonProgressStore::new(&path);
        assert!(matches!(store.load().await, Err(StorageError::Json(_))));
    }
}
