//! Auto-grading over the registered scoring rules.

use labtrack_core::{time, Time};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

use crate::error::Result;
use crate::namespace::Namespace;
use crate::validator::LabValidator;

/// Outcome of one rule in a grading run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    /// Rule name
    pub rule: String,
    /// Score in [0, 100]
    pub score: f64,
    /// `score * weight`
    pub weighted_score: f64,
    /// Rule weight
    pub weight: f64,
    /// Whether the rule passed
    pub success: bool,
    /// Rule description
    pub description: String,
}

/// Result of [`LabValidator::run_auto_grading`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingReport {
    /// Weighted mean score, 0 when the weights sum to 0
    pub final_score: f64,
    /// Sum of rule weights
    pub total_weight: f64,
    /// Per-rule results in rule order
    pub detailed_results: Vec<RuleResult>,
    /// When grading ran
    pub timestamp: Time,
}

impl GradingReport {
    /// Letter grade of the final score.
    pub fn grade(&self) -> &'static str {
        score_to_grade(self.final_score)
    }
}

/// Letter grade for a score in [0, 100].
pub fn score_to_grade(score: f64) -> &'static str {
    const GRADES: [(f64, &str); 11] = [
        (93.0, "A"),
        (90.0, "A-"),
        (87.0, "B+"),
        (83.0, "B"),
        (80.0, "B-"),
        (77.0, "C+"),
        (73.0, "C"),
        (70.0, "C-"),
        (67.0, "D+"),
        (63.0, "D"),
        (60.0, "D-"),
    ];
    GRADES
        .iter()
        .find(|(min, _)| score >= *min)
        .map_or("F", |(_, grade)| *grade)
}

fn marker(score: f64) -> &'static str {
    if score >= 70.0 {
        "✅"
    } else if score >= 40.0 {
        "⚠️"
    } else {
        "❌"
    }
}

impl LabValidator {
    /// Run every scoring rule in order and combine the weighted scores.
    ///
    /// With a tracker attached, the final score is recorded on it.
    pub async fn run_auto_grading(&mut self, namespace: &Namespace) -> GradingReport {
        self.grade(namespace, true).await
    }

    async fn grade(&mut self, namespace: &Namespace, verbose: bool) -> GradingReport {
        let rules: Vec<(String, f64, String)> = self
            .rules
            .iter()
            .map(|r| (r.name.clone(), r.weight, r.description.clone()))
            .collect();

        let mut detailed_results = Vec::with_capacity(rules.len());
        let mut total_score = 0.0;
        let mut total_weight = 0.0;
        for (name, weight, description) in rules {
            let (success, score) = self.validate_with_score(&name, namespace);
            let weighted_score = score * weight;
            total_score += weighted_score;
            total_weight += weight;
            detailed_results.push(RuleResult {
                rule: name,
                score,
                weighted_score,
                weight,
                success,
                description,
            });
        }

        let final_score = if total_weight > 0.0 {
            total_score / total_weight
        } else {
            0.0
        };
        let report = GradingReport {
            final_score,
            total_weight,
            detailed_results,
            timestamp: time::now(),
        };
        tracing::info!(
            "Auto-grading: {:.1} ({}) over {} rules",
            final_score,
            report.grade(),
            report.detailed_results.len()
        );

        if verbose {
            self.show_grading(&report);
        }
        if let Some(tracker) = &self.tracker {
            if let Err(e) = tracker.lock().await.record_overall_score(final_score).await {
                tracing::warn!("Could not record overall score: {}", e);
            }
        }
        report
    }

    fn show_grading(&self, report: &GradingReport) {
        let mut body = String::new();
        for result in &report.detailed_results {
            let _ = write!(body, "{} {}", marker(result.score), result.rule);
            if !result.description.is_empty() {
                let _ = write!(body, " - {}", result.description);
            }
            let _ = writeln!(
                body,
                ": {:.0}% (weight: {:.1}%)",
                result.score,
                result.weight * 100.0
            );
        }
        let _ = write!(
            body,
            "\nFinal Score: {:.0}%\nGrade: {}\nTotal weight: {:.1}%",
            report.final_score,
            report.grade(),
            report.total_weight * 100.0
        );
        self.display.show_info("Auto-Grading Results", &body);
    }

    /// Grade quietly and render the plain-text grading report.
    ///
    /// The report is also written to `filename` when given.
    pub async fn export_grading_report(
        &mut self,
        namespace: &Namespace,
        filename: Option<&Path>,
    ) -> Result<String> {
        let results = self.grade(namespace, false).await;

        let mut report = String::from("Lab Auto-Grading Report\n");
        report.push_str(&"=".repeat(50));
        report.push_str("\n\n");
        let _ = writeln!(report, "Final Score: {:.1}%", results.final_score);
        let _ = writeln!(report, "Grade: {}", results.grade());
        let _ = writeln!(report, "Timestamp: {}\n", time::format_timestamp(&results.timestamp));
        report.push_str("Detailed Results:\n");
        report.push_str(&"-".repeat(30));
        report.push('\n');

        for result in &results.detailed_results {
            let _ = writeln!(report, "\n{}:", result.rule);
            let _ = writeln!(report, "  Score: {:.0}%", result.score);
            let _ = writeln!(report, "  Weight: {:.1}%", result.weight * 100.0);
            let _ = writeln!(report, "  Weighted Score: {:.1}", result.weighted_score);
            if !result.description.is_empty() {
                let _ = writeln!(report, "  Description: {}", result.description);
            }
        }

        if let Some(path) = filename {
            tokio::fs::write(path, &report).await?;
            tracing::info!("Grading report written to {}", path.display());
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{Checker, RuleOutcome};
    use crate::validator::tests::RecordingTarget;
    use labtrack_core::MemoryDisplay;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    fn fixed(score: f64) -> Checker {
        Checker::func(move |_| {
            Ok(RuleOutcome::Scored {
                success: score >= 50.0,
                score,
            })
        })
    }

    fn three_rules(v: &mut LabValidator) {
        v.add_scoring_rule("load", 0.5, fixed(100.0), "Data loaded", true);
        v.add_scoring_rule("clean", 0.3, fixed(0.0), "", true);
        v.add_scoring_rule("plot", 0.2, fixed(50.0), "Chart drawn", true);
    }

    #[tokio::test]
    async fn test_weighted_final_score() {
        let target = Arc::new(Mutex::new(RecordingTarget::default()));
        let mut v = LabValidator::new().with_tracker(target.clone());
        three_rules(&mut v);

        let report = v.run_auto_grading(&Namespace::new()).await;
        assert!((report.final_score - 60.0).abs() < 1e-9);
        assert!((report.total_weight - 1.0).abs() < 1e-9);
        assert_eq!(report.grade(), "D-");

        let names: Vec<_> = report.detailed_results.iter().map(|r| r.rule.as_str()).collect();
        assert_eq!(names, vec!["load", "clean", "plot"]);
        assert_eq!(report.detailed_results[2].weighted_score, 10.0);

        let recorded = target.lock().await.overall.unwrap();
        assert!((recorded - 60.0).abs() < 1e-9);
        assert_eq!(v.validation_history().len(), 3);
    }

    #[tokio::test]
    async fn test_failing_rule_does_not_stop_grading() {
        let mut v = LabValidator::new();
        v.add_scoring_rule("good", 1.0, fixed(100.0), "", true);
        v.add_scoring_rule("bad", 1.0, Checker::func(|_| anyhow::bail!("boom")), "", true);

        let report = v.run_auto_grading(&Namespace::new()).await;
        assert_eq!(report.detailed_results.len(), 2);
        assert!(!report.detailed_results[1].success);
        assert_eq!(report.final_score, 50.0);
    }

    #[tokio::test]
    async fn test_zero_weight() {
        let mut v = LabValidator::new();
        assert_eq!(v.run_auto_grading(&Namespace::new()).await.final_score, 0.0);

        v.add_scoring_rule("free", 0.0, fixed(100.0), "", true);
        let report = v.run_auto_grading(&Namespace::new()).await;
        assert_eq!(report.final_score, 0.0);
        assert_eq!(report.grade(), "F");
    }

    #[test]
    fn test_score_to_grade() {
        let cases = [
            (100.0, "A"),
            (93.0, "A"),
            (92.9, "A-"),
            (90.0, "A-"),
            (88.0, "B+"),
            (85.0, "B"),
            (80.0, "B-"),
            (78.0, "C+"),
            (75.0, "C"),
            (70.0, "C-"),
            (68.0, "D+"),
            (65.0, "D"),
            (60.0, "D-"),
            (59.9, "F"),
            (0.0, "F"),
        ];
        for (score, grade) in cases {
            assert_eq!(score_to_grade(score), grade, "score {score}");
        }
    }

    #[tokio::test]
    async fn test_grading_is_shown() {
        let display = Arc::new(MemoryDisplay::new());
        let mut v = LabValidator::new().with_display(display.clone());
        three_rules(&mut v);
        v.run_auto_grading(&Namespace::new()).await;
        assert!(display.contains("info Auto-Grading Results: ✅ load - Data loaded: 100% (weight: 50.0%)"));
        assert!(display.contains("Grade: D-"));
    }

    #[tokio::test]
    async fn test_export_grading_report() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("grades.txt");
        let display = Arc::new(MemoryDisplay::new());
        let mut v = LabValidator::new().with_display(display.clone());
        three_rules(&mut v);

        let report = v
            .export_grading_report(&Namespace::new(), Some(&file))
            .await
            .unwrap();
        assert!(report.starts_with("Lab Auto-Grading Report\n"));
        assert!(report.contains("Final Score: 60.0%\nGrade: D-\n"));
        assert!(report.contains("\nload:\n  Score: 100%\n  Weight: 50.0%\n  Weighted Score: 50.0\n  Description: Data loaded\n"));
        assert!(report.contains("\nclean:\n  Score: 0%\n  Weight: 30.0%\n  Weighted Score: 0.0\n"));
        assert!(!report.contains("clean:\n  Score: 0%\n  Weight: 30.0%\n  Weighted Score: 0.0\n  Description"));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), report);
        assert!(!display.contains("Auto-Grading Results"));
    }
}
