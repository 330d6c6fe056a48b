//! Step tips and guidance lookup.

use labtrack_core::StepMetadata;
use std::fmt::Write as _;

use crate::tracker::LabProgress;

/// What guidance is available for a step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepGuidance {
    /// No step was named and every step is done
    AllComplete,
    /// The named step is not registered
    UnknownStep(String),
    /// The step has no metadata
    NoTips(String),
    /// Guidance for the step
    Tips {
        /// Step name
        step: String,
        /// Its metadata
        metadata: StepMetadata,
    },
}

impl StepGuidance {
    /// Title and body for an informational notice.
    pub fn render(&self) -> (String, String) {
        match self {
            StepGuidance::AllComplete => (
                "Congratulations".to_string(),
                "All steps completed! 🎉".to_string(),
            ),
            StepGuidance::UnknownStep(step) => {
                ("Error".to_string(), format!("Step '{step}' not found"))
            }
            StepGuidance::NoTips(step) => (
                "Step Info".to_string(),
                format!("No tips available for step: {step}"),
            ),
            StepGuidance::Tips { step, metadata } => {
                let mut body = String::new();
                match &metadata.instructions {
                    Some(text) => body.push_str(text),
                    None => {
                        let _ = write!(body, "Complete the '{step}' step");
                    }
                }
                body.push('\n');
                if !metadata.tips.is_empty() {
                    body.push_str("\nTips:\n");
                    for (category, tip) in &metadata.tips {
                        let _ = writeln!(body, "  {category}: {tip}");
                    }
                }
                if !metadata.hints.is_empty() {
                    body.push_str("\nHints:\n");
                    for (i, hint) in metadata.hints.iter().enumerate() {
                        let _ = writeln!(body, "  {}. {hint}", i + 1);
                    }
                }
                if !metadata.common_mistakes.is_empty() {
                    body.push_str("\nCommon mistakes:\n");
                    for mistake in &metadata.common_mistakes {
                        let _ = writeln!(body, "  - {mistake}");
                    }
                }
                (format!("Step Guide: {step}"), body)
            }
        }
    }
}

impl LabProgress {
    /// Guidance for `step`, or for the current step when `None`.
    pub fn step_guidance(&self, step: Option<&str>) -> StepGuidance {
        let step = match step.or_else(|| self.current_step()) {
            Some(step) => step.to_string(),
            None => return StepGuidance::AllComplete,
        };
        if !self.steps.contains(&step) {
            return StepGuidance::UnknownStep(step);
        }
        match self.step_metadata.get(&step) {
            Some(metadata) if !metadata.is_empty() => StepGuidance::Tips {
                metadata: metadata.clone(),
                step,
            },
            _ => StepGuidance::NoTips(step),
        }
    }

    /// Show guidance for `step` (or the current step) on the display surface.
    pub fn show_step_tips(&self, step: Option<&str>) -> StepGuidance {
        let guidance = self.step_guidance(step);
        let (title, body) = guidance.render();
        self.display.show_info(&title, &body);
        guidance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labtrack_core::MemoryDisplay;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_guidance_for_current_step() {
        let mut progress = LabProgress::new(["Load", "Clean"], "Lab");
        let meta = StepMetadata::new("Load the data")
            .with_tip("pandas", "Use read_csv")
            .with_hint("Check the path");
        progress.set_step_metadata("Load", meta.clone()).await.unwrap();

        assert_eq!(
            progress.step_guidance(None),
            StepGuidance::Tips {
                step: "Load".to_string(),
                metadata: meta,
            }
        );
        assert_eq!(
            progress.step_guidance(Some("Clean")),
            StepGuidance::NoTips("Clean".to_string())
        );
        assert_eq!(
            progress.step_guidance(Some("Ghost")),
            StepGuidance::UnknownStep("Ghost".to_string())
        );
    }

    #[tokio::test]
    async fn test_all_complete() {
        let mut progress = LabProgress::new(["Only"], "Lab");
        progress.mark_done("Only", None, "").await.unwrap();
        assert_eq!(progress.step_guidance(None), StepGuidance::AllComplete);
    }

    #[tokio::test]
    async fn test_metadata_on_unknown_step_is_ignored() {
        let mut progress = LabProgress::new(["A"], "Lab");
        progress
            .set_step_metadata("B", StepMetadata::new("nope"))
            .await
            .unwrap();
        assert!(progress.metadata("B").is_none());
    }

    #[tokio::test]
    async fn test_show_step_tips_renders() {
        let display = Arc::new(MemoryDisplay::new());
        let mut progress = LabProgress::builder()
            .steps(["Load"])
            .display(display.clone())
            .open()
            .await
            .unwrap();
        progress
            .set_step_metadata(
                "Load",
                StepMetadata::default().with_common_mistake("Wrong separator"),
            )
            .await
            .unwrap();

        progress.show_step_tips(Some("Load"));
        assert!(display.contains("info Step Guide: Load: Complete the 'Load' step"));
        assert!(display.contains("- Wrong separator"));
    }
}
