//! Plain-text report and analytics exports.

use labtrack_core::time;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::analytics::AnalyticsSummary;
use crate::error::Result;
use crate::tracker::LabProgress;
use labtrack_core::Event;

/// Shape of the JSON analytics export.
#[derive(Debug, Serialize)]
struct AnalyticsExport<'a> {
    lab_name: &'a str,
    session_id: &'a str,
    student_id: &'a str,
    export_timestamp: String,
    summary: Value,
    events: &'a [Event],
}

impl LabProgress {
    /// Plain-text summary of the session.
    pub fn export_report(&self) -> String {
        let mut report = format!("Lab Progress Report: {}\n", self.lab_name);
        report.push_str(&"=".repeat(50));
        report.push_str("\n\n");
        let _ = writeln!(report, "Completion Rate: {:.1}%", self.completion_rate());
        if let Some(avg) = self.average_score() {
            let _ = writeln!(report, "Average Score: {avg:.1}/100");
        }

        report.push_str("\nSteps:\n");
        for (name, state) in self.steps.iter() {
            let status = if state.completed {
                "✅ Completed"
            } else {
                "⏳ Pending"
            };
            let _ = writeln!(report, "- {name}: {status}");
            if let Some(score) = state.score {
                let _ = writeln!(report, "  Score: {score:?}/100");
            }
            if state.attempts > 0 {
                let _ = writeln!(report, "  Attempts: {}", state.attempts);
            }
        }
        report
    }

    fn default_export_name(&self, extension: &str) -> PathBuf {
        let stamp = time::now().format("%Y%m%d_%H%M%S");
        PathBuf::from(format!(
            "{}_analytics_{stamp}.{extension}",
            self.lab_name.to_lowercase().replace(' ', "_")
        ))
    }

    /// Write the event log as CSV and return the file name.
    ///
    /// Columns are the sorted union of every event's keys. With no events
    /// nothing is written and the name is still returned.
    pub async fn export_analytics_csv(&self, filename: Option<&Path>) -> Result<PathBuf> {
        let path = filename
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.default_export_name("csv"));
        if self.analytics.is_empty() {
            return Ok(path);
        }

        let rows: Vec<_> = self.analytics.iter().map(Event::to_fields).collect();
        let columns: BTreeSet<&str> = rows
            .iter()
            .flat_map(|row| row.keys().map(String::as_str))
            .collect();

        let mut out = String::new();
        push_record(&mut out, columns.iter().map(|c| c.to_string()));
        for row in &rows {
            push_record(
                &mut out,
                columns.iter().map(|c| row.get(*c).map(csv_cell).unwrap_or_default()),
            );
        }

        tokio::fs::write(&path, out).await?;
        tracing::info!("Exported {} events to {}", rows.len(), path.display());
        Ok(path)
    }

    /// Write the summary and event log as JSON and return the file name.
    pub async fn export_analytics_json(&self, filename: Option<&Path>) -> Result<PathBuf> {
        let path = filename
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.default_export_name("json"));

        let summary = match self.get_analytics_summary() {
            Some(summary) => serde_json::to_value::<AnalyticsSummary>(summary)?,
            None => Value::Object(Default::default()),
        };
        let export = AnalyticsExport {
            lab_name: &self.lab_name,
            session_id: self.session_id.as_str(),
            student_id: self.student_id.as_str(),
            export_timestamp: time::format_timestamp(&time::now()),
            summary,
            events: &self.analytics,
        };

        tokio::fs::write(&path, serde_json::to_string_pretty(&export)?).await?;
        tracing::info!("Exported analytics to {}", path.display());
        Ok(path)
    }
}

fn csv_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn push_record(out: &mut String, fields: impl Iterator<Item = String>) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        if field.contains([',', '"', '\n', '\r']) {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(&field);
        }
    }
    out.push_str("\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_export_report() {
        let mut progress = LabProgress::new(["Setup", "Train"], "Report Lab");
        progress.mark_done("Setup", Some(85.0), "").await.unwrap();
        progress.increment_attempts("Train").await.unwrap();

        let report = progress.export_report();
        assert!(report.starts_with("Lab Progress Report: Report Lab\n"));
        assert!(report.contains(&"=".repeat(50)));
        assert!(report.contains("Completion Rate: 50.0%"));
        assert!(report.contains("Average Score: 85.0/100"));
        assert!(report.contains("- Setup: ✅ Completed\n  Score: 85.0/100\n"));
        assert!(report.contains("- Train: ⏳ Pending\n  Attempts: 1\n"));
    }

    #[test]
    fn test_report_without_scores() {
        let progress = LabProgress::new(["A"], "Lab");
        let report = progress.export_report();
        assert!(!report.contains("Average Score"));
        assert!(report.ends_with("- A: ⏳ Pending\n"));
    }

    #[tokio::test]
    async fn test_csv_columns_are_union_of_keys() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("events.csv");
        let mut progress = LabProgress::new(["A", "B"], "Lab");
        progress.increment_attempts("A").await.unwrap();
        progress.mark_done("B", Some(90.0), "well, done").await.unwrap();

        let written = progress.export_analytics_csv(Some(&file)).await.unwrap();
        assert_eq!(written, file);

        let text = std::fs::read_to_string(&file).unwrap();
        let mut lines = text.split("\r\n");
        assert_eq!(
            lines.next().unwrap(),
            "event_type,lab_name,notes,score,session_id,step_name,student_id,time_spent,timestamp"
        );
        let attempt = lines.next().unwrap();
        assert!(attempt.starts_with("attempt,Lab,,,"));
        let completed = lines.next().unwrap();
        assert!(completed.starts_with("step_completed,Lab,\"well, done\",90.0,"));
    }

    #[tokio::test]
    async fn test_csv_without_events_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("empty.csv");
        let progress = LabProgress::new(["A"], "Lab");
        let written = progress.export_analytics_csv(Some(&file)).await.unwrap();
        assert_eq!(written, file);
        assert!(!file.exists());
    }

    #[test]
    fn test_default_export_name() {
        let progress = LabProgress::new(["A"], "My Lab");
        let name = progress.default_export_name("csv");
        let name = name.to_string_lossy();
        assert!(name.starts_with("my_lab_analytics_"));
        assert!(name.ends_with(".csv"));
    }

    #[tokio::test]
    async fn test_export_json() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("analytics.json");
        let mut progress = LabProgress::new(["A"], "Lab");

        progress.export_analytics_json(Some(&file)).await.unwrap();
        let data: Value = serde_json::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(data["summary"], serde_json::json!({}));
        assert_eq!(data["events"], serde_json::json!([]));

        progress.mark_done("A", Some(70.0), "").await.unwrap();
        progress.export_analytics_json(Some(&file)).await.unwrap();
        let data: Value = serde_json::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(data["lab_name"], "Lab");
        assert_eq!(data["student_id"], progress.student_id().as_str());
        assert_eq!(data["summary"]["total_events"], 1);
        assert_eq!(data["summary"]["step_analytics"]["A"]["score"], 70.0);
        assert_eq!(data["events"][0]["event_type"], "step_completed");
        assert!(data["export_timestamp"].is_string());
    }
}
